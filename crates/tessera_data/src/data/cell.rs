use crate::data::ids::OrgId;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a cell inside its lattice.
///
/// Cells refer to each other only through these ids; the lattice resolves
/// them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct CellId(pub usize);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell-{}", self.0)
    }
}

/// Auxiliary payload stored on a cell.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct CellData {
    /// Arbitrary value written by organisms.
    pub contents: i32,
    /// Organism that last wrote `contents`.
    pub org_id: Option<OrgId>,
    /// Update tick of the last write.
    pub update: Option<u64>,
    /// Territory tag.
    pub territory: Option<i32>,
}
