//! Tessera: a lattice of self-replicating programs.
//!
//! The simulation substrate lives in `tessera_core`; this crate adds the
//! reference [`model::world::World`] driver and the headless binary.

pub mod model;

pub use model::genotypes::{GenotypeRecord, GenotypeRegistry};
pub use model::world::{UpdateReport, World};
