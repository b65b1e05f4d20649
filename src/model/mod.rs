pub use tessera_core::{GenomeLogic, MutationLogic};
pub mod config {
    pub use tessera_core::config::*;
}
pub mod lattice {
    pub use tessera_core::lattice::*;
}
pub mod hardware {
    pub use tessera_core::hardware::*;
}

pub mod genotypes;
pub mod persistence;
pub mod world;
