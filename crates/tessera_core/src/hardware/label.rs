//! Nop labels and complement search.

use crate::hardware::inst_set::InstSet;
use crate::hardware::memory::MemorySpace;

/// Scan direction for [`find_label`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// A bounded sequence of nop symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Label {
    nops: Vec<u8>,
    max: usize,
}

impl Label {
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            nops: Vec::with_capacity(max),
            max,
        }
    }

    #[must_use]
    pub fn from_nops(nops: &[u8], max: usize) -> Self {
        let mut label = Self::new(max);
        for &n in nops {
            label.push(n);
        }
        label
    }

    /// Appends a symbol; returns `false` once the label is full.
    pub fn push(&mut self, nop: u8) -> bool {
        if self.nops.len() >= self.max {
            return false;
        }
        self.nops.push(nop);
        true
    }

    pub fn clear(&mut self) {
        self.nops.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nops.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.nops
    }

    /// Each symbol rotated by half the nop alphabet.
    #[must_use]
    pub fn complement(&self, num_nops: usize) -> Self {
        Self {
            nops: self
                .nops
                .iter()
                .map(|&n| complement_nop(n, num_nops))
                .collect(),
            max: self.max,
        }
    }
}

#[inline]
#[must_use]
pub fn complement_nop(nop: u8, num_nops: usize) -> u8 {
    ((usize::from(nop) + num_nops / 2) % num_nops) as u8
}

fn matches_at(space: &MemorySpace, set: &InstSet, start: usize, pattern: &[u8]) -> bool {
    let code = space.instructions();
    start + pattern.len() <= code.len()
        && pattern
            .iter()
            .zip(&code[start..start + pattern.len()])
            .all(|(&want, &inst)| set.nop_mod(inst) == Some(want))
}

/// Searches `space` for the complement of `label`.
///
/// Forward scans candidate starts from `from`, backward scans candidate ends
/// from `from - 1`, each wrapping at most once around the space. The result
/// is the position just past the match (which may equal the space length),
/// nearest in scan direction first. An empty label never matches.
#[must_use]
pub fn find_label(
    space: &MemorySpace,
    set: &InstSet,
    from: usize,
    direction: Direction,
    label: &Label,
    num_nops: usize,
) -> Option<usize> {
    let len = space.len();
    if label.is_empty() || len == 0 || label.len() > len {
        return None;
    }
    let target = label.complement(num_nops);
    let pattern = target.as_slice();
    let width = pattern.len();
    let from = from % (len + 1);
    match direction {
        Direction::Forward => (0..len)
            .map(|k| (from + k) % len)
            .find(|&b| matches_at(space, set, b, pattern))
            .map(|b| b + width),
        Direction::Backward => (1..=len)
            .map(|k| (from + len - k) % len)
            .filter(|&e| e + 1 >= width)
            .find(|&e| matches_at(space, set, e + 1 - width, pattern))
            .map(|e| e + 1),
    }
}
