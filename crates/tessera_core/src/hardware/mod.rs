//! The four-stack virtual CPU.
//!
//! A CPU owns several memory spaces, a set of global stacks shared by its
//! threads, and a thread table. Each thread carries four heads (IP, READ,
//! WRITE, FLOW), its local stacks and two label registers. Instructions are
//! dispatched through [`inst_set::Opcode`]; handlers report `false` when an
//! instruction had no effect.

pub mod cpu;
pub mod divide;
pub mod head;
pub mod inst_set;
pub mod instructions;
pub mod label;
pub mod memory;
pub mod stack;
pub mod thread;

pub use cpu::Cpu;
pub use head::Head;
pub use inst_set::{InstSet, Opcode, DEFAULT_INSTRUCTIONS, NUM_NOPS};
pub use label::{find_label, Direction, Label};
pub use memory::{InstFlags, MemorySpace};
pub use stack::CpuStack;
pub use thread::{Thread, ThreadTable};

use crate::config::{AllocMethod, AppConfig, DivideConfig};
use crate::error::{DivideFailure, HardwareError, Result};
use std::sync::Arc;
use tessera_data::{Genome, Instruction, MutationRates};

pub const NUM_HEADS: usize = 4;
pub const HEAD_IP: usize = 0;
pub const HEAD_READ: usize = 1;
pub const HEAD_WRITE: usize = 2;
pub const HEAD_FLOW: usize = 3;

pub const STACK_AX: usize = 0;
pub const STACK_BX: usize = 1;
pub const STACK_CX: usize = 2;
pub const STACK_DX: usize = 3;

/// Immutable per-run hardware parameters, shared by every CPU.
#[derive(Debug, Clone)]
pub struct HardwareSetup {
    pub inst_set: InstSet,
    pub memory_spaces: usize,
    pub local_stacks: usize,
    pub global_stacks: usize,
    pub stack_depth: usize,
    pub max_label_size: usize,
    pub max_threads: usize,
    pub slicing: Vec<f64>,
    pub costs_enabled: bool,
    pub alloc_method: AllocMethod,
    pub default_inst: Instruction,
    pub divide: DivideConfig,
    pub num_inputs: usize,
}

impl HardwareSetup {
    /// Resolves the configured instruction list once.
    pub fn from_config(config: &AppConfig) -> Result<Arc<Self>> {
        let hw = &config.hardware;
        let inst_set = InstSet::from_config(&hw.instructions)?;
        let default_inst = inst_set
            .lookup(&hw.default_instruction)
            .ok_or_else(|| HardwareError::UnknownInstruction(hw.default_instruction.clone()))?;
        Ok(Arc::new(Self {
            inst_set,
            memory_spaces: hw.memory_spaces.max(1),
            local_stacks: hw.local_stacks.max(1),
            global_stacks: hw.global_stacks,
            stack_depth: hw.stack_depth,
            max_label_size: hw.max_label_size,
            max_threads: hw.max_threads.clamp(1, 32),
            slicing: hw.slicing_table(),
            costs_enabled: hw.instruction_costs,
            alloc_method: hw.alloc_method,
            default_inst,
            divide: config.divide.clone(),
            num_inputs: config.environment.num_inputs,
        }))
    }

    /// Default configuration; handy for tests and tools.
    #[must_use]
    pub fn standard() -> Arc<Self> {
        let inst_set = InstSet::standard();
        let config = AppConfig::default();
        let hw = &config.hardware;
        Arc::new(Self {
            default_inst: inst_set.nop_instruction(0).unwrap_or_default(),
            inst_set,
            memory_spaces: hw.memory_spaces,
            local_stacks: hw.local_stacks,
            global_stacks: hw.global_stacks,
            stack_depth: hw.stack_depth,
            max_label_size: hw.max_label_size,
            max_threads: hw.max_threads,
            slicing: hw.slicing_table(),
            costs_enabled: hw.instruction_costs,
            alloc_method: hw.alloc_method,
            divide: config.divide.clone(),
            num_inputs: config.environment.num_inputs,
        })
    }

    #[inline]
    #[must_use]
    pub fn num_stacks(&self) -> usize {
        self.local_stacks + self.global_stacks
    }

    #[inline]
    #[must_use]
    pub fn next_stack(&self, stack: usize) -> usize {
        (stack + 1) % self.num_stacks()
    }

    #[inline]
    #[must_use]
    pub fn prev_stack(&self, stack: usize) -> usize {
        (stack + self.num_stacks() - 1) % self.num_stacks()
    }

    #[inline]
    #[must_use]
    pub fn complement_stack(&self, stack: usize) -> usize {
        (stack + self.num_stacks() / 2) % self.num_stacks()
    }

    #[inline]
    #[must_use]
    pub fn normalize_space(&self, space: usize) -> usize {
        space % self.memory_spaces
    }

    /// Per-thread instruction credit when `threads` threads are alive.
    #[must_use]
    pub fn slice_for(&self, threads: usize) -> f64 {
        match self.slicing.len() {
            0 => 1.0,
            n => self.slicing[threads.min(n - 1)],
        }
    }
}

/// Something a CPU produced that its host has to resolve.
#[derive(Debug, Clone, PartialEq)]
pub enum HardwareEvent {
    /// A validated, mutated offspring genome.
    Division {
        child: Genome,
        mut_rates: MutationRates,
    },
    /// Code to be injected into the faced neighbor.
    Injection { code: Genome },
    DivideFailed(DivideFailure),
    CopyCorrectionExhausted { attempts: u32 },
}
