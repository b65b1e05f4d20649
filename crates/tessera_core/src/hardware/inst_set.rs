//! Instruction set: names, opcodes and per-instruction costs.
//!
//! A genome stores bare `u8` indices. The instruction set built from
//! configuration maps each index to an [`Opcode`], which is what the CPU
//! dispatches on. Several indices may share one opcode.

use crate::config::InstructionConfig;
use crate::error::{HardwareError, Result};
use rand::{Rng, RngCore};
use std::collections::HashMap;
use tessera_data::{Genome, Instruction};

/// Number of nop instructions; they double as label symbols.
pub const NUM_NOPS: usize = 4;

/// Instruction names and opcodes in the order the default set assigns
/// indices.
pub const DEFAULT_INSTRUCTIONS: &[(&str, Opcode)] = &[
    ("nop-A", Opcode::Nop(0)),
    ("nop-B", Opcode::Nop(1)),
    ("nop-C", Opcode::Nop(2)),
    ("nop-D", Opcode::Nop(3)),
    ("val-shift-r", Opcode::ShiftRight),
    ("val-shift-l", Opcode::ShiftLeft),
    ("val-nand", Opcode::Nand),
    ("val-add", Opcode::Add),
    ("val-sub", Opcode::Sub),
    ("val-mult", Opcode::Mult),
    ("val-div", Opcode::Div),
    ("val-mod", Opcode::Mod),
    ("val-inc", Opcode::Inc),
    ("val-dec", Opcode::Dec),
    ("SetMemory", Opcode::SetMemory),
    ("Divide", Opcode::Divide),
    ("Inject", Opcode::Inject),
    ("inst-read", Opcode::InstRead),
    ("inst-write", Opcode::InstWrite),
    ("inst-copy", Opcode::Copy),
    ("inst-copy-ec", Opcode::CopyErrorCorrect),
    ("if-equal", Opcode::IfEqual),
    ("if-not-equal", Opcode::IfNotEqual),
    ("if-less", Opcode::IfLess),
    ("if-greater", Opcode::IfGreater),
    ("head-push", Opcode::HeadPush),
    ("head-pop", Opcode::HeadPop),
    ("head-move", Opcode::HeadMove),
    ("search", Opcode::Search),
    ("push-next", Opcode::PushNext),
    ("push-prev", Opcode::PushPrev),
    ("push-comp", Opcode::PushComp),
    ("val-delete", Opcode::Delete),
    ("val-copy", Opcode::CopyValue),
    ("fork-thread", Opcode::ForkThread),
    ("kill-thread", Opcode::KillThread),
    ("if-label", Opcode::IfLabel),
    ("IO", Opcode::Io),
    ("rotate-l", Opcode::RotateLeft),
    ("rotate-r", Opcode::RotateRight),
    ("get-facing", Opcode::GetFacing),
    ("sense-neighbors", Opcode::SenseNeighbors),
    ("get-cell-data", Opcode::GetCellData),
    ("set-cell-data", Opcode::SetCellData),
];

/// Operation a CPU can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// No operation; the value is the nop symbol `0..NUM_NOPS`.
    Nop(u8),
    ShiftRight,
    ShiftLeft,
    Nand,
    Add,
    Sub,
    Mult,
    Div,
    Mod,
    Inc,
    Dec,
    SetMemory,
    Divide,
    Inject,
    InstRead,
    InstWrite,
    Copy,
    CopyErrorCorrect,
    IfEqual,
    IfNotEqual,
    IfLess,
    IfGreater,
    HeadPush,
    HeadPop,
    HeadMove,
    Search,
    PushNext,
    PushPrev,
    PushComp,
    Delete,
    CopyValue,
    ForkThread,
    KillThread,
    IfLabel,
    Io,
    RotateLeft,
    RotateRight,
    GetFacing,
    SenseNeighbors,
    GetCellData,
    SetCellData,
}

impl Opcode {
    /// Resolves a configured instruction name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name {
            "nop-A" => Self::Nop(0),
            "nop-B" => Self::Nop(1),
            "nop-C" => Self::Nop(2),
            "nop-D" => Self::Nop(3),
            "val-shift-r" => Self::ShiftRight,
            "val-shift-l" => Self::ShiftLeft,
            "val-nand" => Self::Nand,
            "val-add" => Self::Add,
            "val-sub" => Self::Sub,
            "val-mult" => Self::Mult,
            "val-div" => Self::Div,
            "val-mod" => Self::Mod,
            "val-inc" => Self::Inc,
            "val-dec" => Self::Dec,
            "SetMemory" => Self::SetMemory,
            "Divide" => Self::Divide,
            "Inject" => Self::Inject,
            "inst-read" => Self::InstRead,
            "inst-write" => Self::InstWrite,
            "inst-copy" => Self::Copy,
            "inst-copy-ec" => Self::CopyErrorCorrect,
            "if-equal" => Self::IfEqual,
            "if-not-equal" => Self::IfNotEqual,
            "if-less" => Self::IfLess,
            "if-greater" => Self::IfGreater,
            "head-push" => Self::HeadPush,
            "head-pop" => Self::HeadPop,
            "head-move" => Self::HeadMove,
            "search" => Self::Search,
            "push-next" => Self::PushNext,
            "push-prev" => Self::PushPrev,
            "push-comp" => Self::PushComp,
            "val-delete" => Self::Delete,
            "val-copy" => Self::CopyValue,
            "fork-thread" => Self::ForkThread,
            "kill-thread" => Self::KillThread,
            "if-label" => Self::IfLabel,
            "IO" => Self::Io,
            "rotate-l" => Self::RotateLeft,
            "rotate-r" => Self::RotateRight,
            "get-facing" => Self::GetFacing,
            "sense-neighbors" => Self::SenseNeighbors,
            "get-cell-data" => Self::GetCellData,
            "set-cell-data" => Self::SetCellData,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Debug, Clone)]
struct InstEntry {
    name: String,
    opcode: Opcode,
    cost: u32,
    ft_cost: u32,
}

/// The resolved instruction table a CPU interprets genomes with.
#[derive(Debug, Clone)]
pub struct InstSet {
    entries: Vec<InstEntry>,
    by_name: HashMap<String, u8>,
    nops: [Option<u8>; NUM_NOPS],
}

impl InstSet {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            by_name: HashMap::new(),
            nops: [None; NUM_NOPS],
        }
    }

    /// Appends an entry at the next free index. The first index seen for a
    /// name or nop symbol wins lookups.
    fn push_entry(&mut self, name: &str, opcode: Opcode, cost: u32, ft_cost: u32) {
        let op = self.entries.len() as u8;
        if let Opcode::Nop(n) = opcode {
            self.nops[usize::from(n)].get_or_insert(op);
        }
        self.by_name.entry(name.to_string()).or_insert(op);
        self.entries.push(InstEntry {
            name: name.to_string(),
            opcode,
            cost,
            ft_cost,
        });
    }

    /// Builds the table, rejecting unknown names.
    pub fn from_config(instructions: &[InstructionConfig]) -> Result<Self> {
        if instructions.is_empty() || instructions.len() > usize::from(u8::MAX) + 1 {
            return Err(HardwareError::UnknownInstruction(format!(
                "instruction set must hold 1..=256 entries, got {}",
                instructions.len()
            )));
        }
        let mut set = Self::with_capacity(instructions.len());
        for config in instructions {
            let opcode = Opcode::from_name(&config.name)
                .ok_or_else(|| HardwareError::UnknownInstruction(config.name.clone()))?;
            set.push_entry(&config.name, opcode, config.cost, config.ft_cost);
        }
        Ok(set)
    }

    /// The default set with every instruction free.
    #[must_use]
    pub fn standard() -> Self {
        let mut set = Self::with_capacity(DEFAULT_INSTRUCTIONS.len());
        for &(name, opcode) in DEFAULT_INSTRUCTIONS {
            set.push_entry(name, opcode, 0, 0);
        }
        set
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Opcode for an instruction; `None` for indices outside the table.
    #[inline]
    #[must_use]
    pub fn opcode(&self, inst: Instruction) -> Option<Opcode> {
        self.entries.get(usize::from(inst.op)).map(|e| e.opcode)
    }

    /// Nop symbol carried by `inst`, if it is a nop.
    #[inline]
    #[must_use]
    pub fn nop_mod(&self, inst: Instruction) -> Option<u8> {
        match self.opcode(inst) {
            Some(Opcode::Nop(n)) => Some(n),
            _ => None,
        }
    }

    /// Instruction encoding nop symbol `n`, if the set contains one.
    #[must_use]
    pub fn nop_instruction(&self, n: u8) -> Option<Instruction> {
        self.nops
            .get(usize::from(n))
            .copied()
            .flatten()
            .map(Instruction::new)
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Instruction> {
        self.by_name.get(name).copied().map(Instruction::new)
    }

    #[must_use]
    pub fn name(&self, inst: Instruction) -> &str {
        self.entries
            .get(usize::from(inst.op))
            .map_or("(invalid)", |e| e.name.as_str())
    }

    #[must_use]
    pub fn cost(&self, op: u8) -> u32 {
        self.entries.get(usize::from(op)).map_or(0, |e| e.cost)
    }

    #[must_use]
    pub fn ft_cost(&self, op: u8) -> u32 {
        self.entries.get(usize::from(op)).map_or(0, |e| e.ft_cost)
    }

    /// Uniformly random instruction from the table.
    pub fn random_inst(&self, rng: &mut dyn RngCore) -> Instruction {
        Instruction::new(rng.gen_range(0..self.entries.len()) as u8)
    }

    /// Builds a genome from instruction names.
    pub fn parse_genome<S: AsRef<str>>(&self, names: &[S]) -> Result<Genome> {
        names
            .iter()
            .map(|name| {
                self.lookup(name.as_ref())
                    .ok_or_else(|| HardwareError::UnknownInstruction(name.as_ref().to_string()))
            })
            .collect()
    }

    /// Instruction names of a genome, in order.
    #[must_use]
    pub fn genome_names(&self, genome: &Genome) -> Vec<String> {
        genome.iter().map(|i| self.name(*i).to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_every_default_name_resolves() {
        for &(name, opcode) in DEFAULT_INSTRUCTIONS {
            assert_eq!(Opcode::from_name(name), Some(opcode), "{name} did not resolve");
        }
        assert_eq!(InstSet::standard().len(), DEFAULT_INSTRUCTIONS.len());
    }

    #[test]
    fn test_standard_matches_default_config() {
        let config = crate::config::AppConfig::default();
        let configured = InstSet::from_config(&config.hardware.instructions).unwrap();
        let standard = InstSet::standard();
        assert_eq!(configured.len(), standard.len());
        for op in 0..standard.len() as u8 {
            let inst = Instruction::new(op);
            assert_eq!(configured.opcode(inst), standard.opcode(inst));
            assert_eq!(configured.name(inst), standard.name(inst));
        }
        assert_eq!(standard.lookup("nop-C"), standard.nop_instruction(2));
    }

    #[test]
    fn test_unknown_name_rejected() {
        let err = InstSet::from_config(&[InstructionConfig::free("warp-drive")]).unwrap_err();
        assert_eq!(err, HardwareError::UnknownInstruction("warp-drive".into()));
    }

    #[test]
    fn test_nop_symbols() {
        let set = InstSet::standard();
        assert_eq!(set.nop_mod(Instruction::new(2)), Some(2));
        assert_eq!(set.nop_mod(Instruction::new(4)), None);
        assert_eq!(set.nop_instruction(3), Some(Instruction::new(3)));
        assert_eq!(set.opcode(Instruction::new(250)), None);
    }

    #[test]
    fn test_reordered_set_keeps_nop_mapping() {
        let set = InstSet::from_config(&[
            InstructionConfig::free("inst-copy"),
            InstructionConfig::free("nop-B"),
            InstructionConfig::free("nop-A"),
        ])
        .unwrap();
        assert_eq!(set.nop_instruction(0), Some(Instruction::new(2)));
        assert_eq!(set.nop_instruction(2), None);
        assert_eq!(set.opcode(Instruction::new(0)), Some(Opcode::Copy));
    }

    #[test]
    fn test_parse_and_name_genome() {
        let set = InstSet::standard();
        let genome = set.parse_genome(&["search", "nop-C", "Divide"]).unwrap();
        assert_eq!(set.genome_names(&genome), vec!["search", "nop-C", "Divide"]);
        assert!(set.parse_genome(&["bogus"]).is_err());
    }

    #[test]
    fn test_random_inst_in_range() {
        let set = InstSet::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(set.opcode(set.random_inst(&mut rng)).is_some());
        }
    }
}
