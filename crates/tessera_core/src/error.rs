//! Error types for tessera_core.
//!
//! Soft instruction failures never reach these types: a handler that cannot
//! act simply reports "no effect". What ends up here are the structural
//! failures (a divide that does not validate, an exhausted copy correction)
//! and invariant violations that must fail fast instead of corrupting state.

use tessera_data::CellId;
use thiserror::Error;

/// Why a divide attempt was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DivideFailure {
    /// Main memory (space 0) holds the parent itself and cannot be divided off.
    #[error("cannot divide from main memory")]
    MainMemory,

    #[error("child genome too short ({size} < {min})")]
    TooShort { size: usize, min: usize },

    #[error("child genome too long ({size} > {max})")]
    TooLong { size: usize, max: usize },

    #[error("parent genome size {size} outside [{min}, {max}]")]
    ParentSize { size: usize, min: usize, max: usize },

    #[error("child size {child} out of range for parent size {parent}")]
    SizeRatio { child: usize, parent: usize },

    #[error("too few copied instructions ({copied} < {required})")]
    TooFewCopied { copied: usize, required: usize },

    #[error("too few executed instructions ({executed} < {required})")]
    TooFewExecuted { executed: usize, required: usize },
}

/// Errors raised by the virtual CPU.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HardwareError {
    /// A head was used on a memory space with no instructions.
    #[error("memory space {space} is empty")]
    EmptySpace { space: usize },

    #[error("position {position} out of range for memory of length {len}")]
    OutOfRange { position: usize, len: usize },

    /// An organism must always keep one thread.
    #[error("cannot kill the last thread")]
    LastThread,

    #[error("thread limit reached ({max})")]
    TooManyThreads { max: usize },

    #[error("invalid divide: {0}")]
    InvalidDivide(#[from] DivideFailure),

    #[error("copy error correction exhausted after {attempts} attempts")]
    CopyCorrectionExhausted { attempts: u32 },

    #[error("unknown instruction: {0}")]
    UnknownInstruction(String),

    /// No empty memory space is available to receive injected code.
    #[error("no empty memory space available")]
    NoEmptySpace,

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Errors raised by the lattice and its cells.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LatticeError {
    #[error("{target} is not a neighbor of {cell}")]
    InvalidNeighbor { cell: CellId, target: CellId },

    #[error("{0} is already occupied")]
    CellOccupied(CellId),

    #[error("{0} is empty")]
    CellEmpty(CellId),

    #[error("{0} does not exist")]
    InvalidCell(CellId),

    #[error("{0} has no neighbors")]
    NoNeighbors(CellId),

    #[error("invalid lattice dimensions {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("hardware error: {0}")]
    Hardware(#[from] HardwareError),
}

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Result type alias for lattice operations.
pub type LatticeResult<T> = std::result::Result<T, LatticeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divide_failure_display() {
        let err = HardwareError::from(DivideFailure::TooShort { size: 3, min: 8 });
        assert_eq!(
            err.to_string(),
            "invalid divide: child genome too short (3 < 8)"
        );
    }

    #[test]
    fn test_lattice_wraps_hardware_error() {
        let err: LatticeError = HardwareError::LastThread.into();
        assert!(matches!(err, LatticeError::Hardware(HardwareError::LastThread)));
        assert!(err.to_string().contains("last thread"));
    }

    #[test]
    fn test_invalid_neighbor_names_both_cells() {
        let err = LatticeError::InvalidNeighbor {
            cell: CellId(4),
            target: CellId(9),
        };
        assert_eq!(err.to_string(), "cell-9 is not a neighbor of cell-4");
    }
}
