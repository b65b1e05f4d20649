use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Per-event mutation probabilities.
///
/// Cells carry their own copy so individual sites can override the global
/// rates; copying is by value.
#[derive(
    Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct MutationRates {
    /// Probability that a single copied instruction is replaced at random.
    pub copy_mut_prob: f64,
    /// Probability of one point substitution in the child at divide.
    pub divide_mut_prob: f64,
    /// Probability of one random insertion in the child at divide.
    pub divide_ins_prob: f64,
    /// Probability of one random deletion in the child at divide.
    pub divide_del_prob: f64,
}

impl MutationRates {
    /// Rates that never mutate anything.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            copy_mut_prob: 0.0,
            divide_mut_prob: 0.0,
            divide_ins_prob: 0.0,
            divide_del_prob: 0.0,
        }
    }
}
