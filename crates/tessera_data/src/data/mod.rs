//! Core data structures for the Tessera simulation.

pub mod cell;
pub mod genome;
pub mod ids;
pub mod mutation;
pub mod snapshot;
