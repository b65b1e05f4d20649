//! Core data structures for the Tessera substrate.
//!
//! Everything in this crate is plain data: it can be archived with serde or
//! rkyv and carries no simulation logic. Behavior lives in `tessera_core`
//! behind extension traits.

pub mod data;

pub use data::cell::{CellData, CellId};
pub use data::genome::{Genome, Instruction};
pub use data::ids::{GenotypeId, OrgId};
pub use data::mutation::MutationRates;
pub use data::snapshot::{
    CellSnapshot, HardwareSnapshot, HeadState, LatticeSnapshot, MemorySnapshot, OrganismSnapshot,
    ThreadSnapshot,
};
