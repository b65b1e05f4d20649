//! # Tessera Core
//!
//! The execution substrate for Tessera, a lattice of self-replicating
//! programs.
//!
//! This crate contains:
//! - A four-stack virtual CPU with heads, labels, threads and multiple
//!   memory spaces
//! - Instruction handlers, offspring division and mutation logic
//! - The population lattice with neighbor topology, facing and placement
//! - Configuration loading, metrics and structured logging
//!
//! ## Architecture
//!
//! Organisms never hold references into the lattice. While an organism
//! runs it sees its cell through [`context::OrganismInterface`], and
//! anything that must reach the rest of the world (a birth, an injection)
//! comes back as a [`hardware::HardwareEvent`] for the caller to resolve.
//! All randomness flows through an explicit RNG, so a seeded run is
//! reproducible.
//!
//! ## Example
//!
//! ```
//! use tessera_core::ancestor::default_ancestor;
//! use tessera_core::context::{DetachedInterface, ExecContext, Externals, NullFeedback, RandomInputs};
//! use tessera_core::hardware::{Cpu, HardwareSetup};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let setup = HardwareSetup::standard();
//! let genome = default_ancestor(&setup.inst_set).unwrap();
//! let mut cpu = Cpu::new(setup, &genome);
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let (mut inputs, mut feedback) = (RandomInputs, NullFeedback);
//! let mut ext = Externals { rng: &mut rng, inputs: &mut inputs, feedback: &mut feedback, update: 0 };
//! let mut cell = DetachedInterface::default();
//! let mut ctx = ExecContext::new(&mut ext, &mut cell);
//! let executed = cpu.single_process(&mut ctx);
//! assert_eq!(executed, 1);
//! ```

/// The default ancestor genome
pub mod ancestor;
/// Configuration management for world and hardware parameters
pub mod config;
/// Host-side hooks an organism sees while executing
pub mod context;
pub mod error;
/// The virtual CPU
pub mod hardware;
/// Population lattice and cells
pub mod lattice;
/// Performance metrics collection and logging
pub mod metrics;
/// Copy and divide-time mutation
pub mod mutation;
pub mod organism;

pub use error::{DivideFailure, HardwareError, LatticeError};
pub use hardware::{Cpu, HardwareEvent, HardwareSetup, InstSet};
pub use lattice::{Census, Lattice};
pub use metrics::{init_logging, Metrics};
pub use mutation::{GenomeLogic, MutationLogic};
pub use organism::Organism;
pub use tessera_data::{CellId, Genome, GenotypeId, Instruction, MutationRates, OrgId};
