//! Plain snapshots of hardware and lattice state.
//!
//! These are what the persistence layer archives; the core only produces and
//! consumes them and never chooses a storage format.

use crate::data::cell::{CellData, CellId};
use crate::data::genome::{Genome, Instruction};
use crate::data::ids::{GenotypeId, OrgId};
use crate::data::mutation::MutationRates;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, PartialEq, Default, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct MemorySnapshot {
    pub instructions: Vec<Instruction>,
    pub copied: Vec<bool>,
    pub mutated: Vec<bool>,
    pub executed: Vec<bool>,
    pub injected: Vec<bool>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct HeadState {
    pub space: usize,
    pub position: usize,
    pub advance: bool,
}

#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct ThreadSnapshot {
    pub id: u32,
    pub heads: Vec<HeadState>,
    /// Local stacks, bottom first.
    pub local_stacks: Vec<Vec<i32>>,
    pub read_label: Vec<u8>,
    pub next_label: Vec<u8>,
    pub owner: Option<GenotypeId>,
}

#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct HardwareSnapshot {
    pub memory: Vec<MemorySnapshot>,
    /// Global stacks, bottom first.
    pub global_stacks: Vec<Vec<i32>>,
    pub threads: Vec<ThreadSnapshot>,
    pub cur_thread: usize,
    pub inst_remainder: f64,
    pub inst_cost: Vec<u32>,
    pub inst_ft_cost: Vec<u32>,
    pub inputs: Vec<i32>,
    pub input_pointer: usize,
    pub time_used: u64,
}

#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct OrganismSnapshot {
    pub id: OrgId,
    pub genotype: GenotypeId,
    pub generation: u32,
    pub genome: Genome,
    pub hardware: HardwareSnapshot,
}

#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct CellSnapshot {
    pub id: CellId,
    pub x: i32,
    pub y: i32,
    pub connections: Vec<CellId>,
    pub mut_rates: MutationRates,
    pub data: CellData,
    pub spec_state: u32,
    pub organism: Option<OrganismSnapshot>,
}

#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct LatticeSnapshot {
    pub width: i32,
    pub height: i32,
    pub cells: Vec<CellSnapshot>,
    /// Lattice-wide total of wasted speculative steps.
    pub speculative_waste: u64,
}
