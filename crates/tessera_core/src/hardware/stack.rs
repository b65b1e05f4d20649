use std::collections::VecDeque;

/// Depth-bounded integer stack.
///
/// Pushing onto a full stack drops the oldest value, so a push never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuStack {
    values: VecDeque<i32>,
    depth: usize,
}

impl CpuStack {
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(depth),
            depth: depth.max(1),
        }
    }

    /// Rebuilds a stack from values listed bottom first.
    #[must_use]
    pub fn from_values(values: &[i32], depth: usize) -> Self {
        let mut stack = Self::new(depth);
        for &v in values {
            stack.push(v);
        }
        stack
    }

    pub fn push(&mut self, value: i32) {
        if self.values.len() == self.depth {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn pop(&mut self) -> Option<i32> {
        self.values.pop_back()
    }

    #[must_use]
    pub fn top(&self) -> Option<i32> {
        self.values.back().copied()
    }

    /// Value `depth` entries below the top.
    #[must_use]
    pub fn peek(&self, depth: usize) -> Option<i32> {
        self.values
            .len()
            .checked_sub(depth + 1)
            .and_then(|i| self.values.get(i).copied())
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values bottom first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<i32> {
        self.values.iter().copied().collect()
    }
}
