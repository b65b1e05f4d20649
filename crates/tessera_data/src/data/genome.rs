use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// A single operation in a genome.
///
/// `op` indexes into the instruction set the genome is interpreted with.
/// The payload travels with the instruction through copies and mutations but
/// is never interpreted by the hardware itself.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct Instruction {
    /// Operation code (index into the instruction set).
    pub op: u8,
    /// Optional opaque data attached to the instruction.
    pub payload: Option<u16>,
}

impl Instruction {
    #[must_use]
    pub const fn new(op: u8) -> Self {
        Self { op, payload: None }
    }

    #[must_use]
    pub const fn with_payload(op: u8, payload: u16) -> Self {
        Self {
            op,
            payload: Some(payload),
        }
    }
}

/// An ordered sequence of instructions defining an organism's program.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct Genome {
    pub instructions: Vec<Instruction>,
}

impl Genome {
    #[must_use]
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Builds a genome from bare operation codes.
    #[must_use]
    pub fn from_ops(ops: &[u8]) -> Self {
        Self {
            instructions: ops.iter().copied().map(Instruction::new).collect(),
        }
    }

    #[must_use]
    pub fn ops(&self) -> Vec<u8> {
        self.instructions.iter().map(|i| i.op).collect()
    }
}

impl Deref for Genome {
    type Target = Vec<Instruction>;

    fn deref(&self) -> &Self::Target {
        &self.instructions
    }
}

impl DerefMut for Genome {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.instructions
    }
}

impl FromIterator<Instruction> for Genome {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self {
            instructions: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Instruction>> for Genome {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }
}
