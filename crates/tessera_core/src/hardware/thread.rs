use crate::error::{HardwareError, Result};
use crate::hardware::head::Head;
use crate::hardware::label::Label;
use crate::hardware::stack::CpuStack;
use crate::hardware::{HEAD_FLOW, HEAD_IP, HEAD_READ, HEAD_WRITE, NUM_HEADS};
use tessera_data::{GenotypeId, ThreadSnapshot};

/// One execution cursor set inside a CPU.
#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    id: u32,
    pub heads: [Head; NUM_HEADS],
    pub stacks: Vec<CpuStack>,
    pub read_label: Label,
    pub next_label: Label,
    /// Genotype that injected this thread, if it is a parasite.
    pub owner: Option<GenotypeId>,
}

impl Thread {
    #[must_use]
    pub fn new(id: u32, local_stacks: usize, stack_depth: usize, max_label: usize) -> Self {
        Self {
            id,
            heads: [Head::default(); NUM_HEADS],
            stacks: vec![CpuStack::new(stack_depth); local_stacks],
            read_label: Label::new(max_label),
            next_label: Label::new(max_label),
            owner: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn ip(&self) -> &Head {
        &self.heads[HEAD_IP]
    }

    /// Returns the READ, WRITE and FLOW heads to the start of main memory.
    pub fn reset_copy_heads(&mut self) {
        for h in [HEAD_READ, HEAD_WRITE, HEAD_FLOW] {
            self.heads[h].set(0, 0);
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ThreadSnapshot {
        ThreadSnapshot {
            id: self.id,
            heads: self.heads.iter().map(Head::state).collect(),
            local_stacks: self.stacks.iter().map(CpuStack::to_vec).collect(),
            read_label: self.read_label.as_slice().to_vec(),
            next_label: self.next_label.as_slice().to_vec(),
            owner: self.owner,
        }
    }

    pub fn from_snapshot(
        snapshot: &ThreadSnapshot,
        local_stacks: usize,
        stack_depth: usize,
        max_label: usize,
    ) -> Result<Self> {
        if snapshot.heads.len() != NUM_HEADS || snapshot.local_stacks.len() != local_stacks {
            return Err(HardwareError::InvalidSnapshot(format!(
                "thread {} has {} heads and {} local stacks",
                snapshot.id,
                snapshot.heads.len(),
                snapshot.local_stacks.len()
            )));
        }
        let mut heads = [Head::default(); NUM_HEADS];
        for (head, state) in heads.iter_mut().zip(&snapshot.heads) {
            *head = Head::from_state(state);
        }
        Ok(Self {
            id: snapshot.id,
            heads,
            stacks: snapshot
                .local_stacks
                .iter()
                .map(|values| CpuStack::from_values(values, stack_depth))
                .collect(),
            read_label: Label::from_nops(&snapshot.read_label, max_label),
            next_label: Label::from_nops(&snapshot.next_label, max_label),
            owner: snapshot.owner,
        })
    }
}

/// The thread collection of one CPU plus the current-thread index.
///
/// Never empty; `current` always indexes a live thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadTable {
    threads: Vec<Thread>,
    current: usize,
    id_chart: u32,
}

impl ThreadTable {
    #[must_use]
    pub fn new(mut first: Thread) -> Self {
        first.id = 0;
        Self {
            threads: vec![first],
            current: 0,
            id_chart: 1,
        }
    }

    pub fn from_parts(threads: Vec<Thread>, current: usize) -> Result<Self> {
        if threads.is_empty() || current >= threads.len() {
            return Err(HardwareError::InvalidSnapshot(format!(
                "thread index {current} invalid for {} threads",
                threads.len()
            )));
        }
        let mut id_chart = 0u32;
        for thread in &threads {
            let bit = 1u32.checked_shl(thread.id).unwrap_or(0);
            if bit == 0 || id_chart & bit != 0 {
                return Err(HardwareError::InvalidSnapshot(format!(
                    "duplicate or out-of-range thread id {}",
                    thread.id
                )));
            }
            id_chart |= bit;
        }
        Ok(Self {
            threads,
            current,
            id_chart,
        })
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn set_current(&mut self, index: usize) {
        if index < self.threads.len() {
            self.current = index;
        }
    }

    #[inline]
    #[must_use]
    pub fn current(&self) -> &Thread {
        &self.threads[self.current]
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut Thread {
        &mut self.threads[self.current]
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Thread> {
        self.threads.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Thread> {
        self.threads.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Thread> {
        self.threads.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Thread> {
        self.threads.iter_mut()
    }

    /// Clones the current thread onto the end of the table and returns the
    /// new index. The current thread stays current.
    pub fn fork(&mut self, max_threads: usize) -> Result<usize> {
        self.push(self.current().clone(), max_threads)
    }

    /// Appends a thread with a fresh id.
    pub fn push(&mut self, mut thread: Thread, max_threads: usize) -> Result<usize> {
        let free = (!self.id_chart).trailing_zeros();
        if self.threads.len() >= max_threads || free >= u32::BITS {
            return Err(HardwareError::TooManyThreads { max: max_threads });
        }
        self.id_chart |= 1 << free;
        thread.id = free;
        self.threads.push(thread);
        Ok(self.threads.len() - 1)
    }

    /// Removes the thread at `index`. Threads after it shift down; if the
    /// current thread was removed, the previous one (wrapping) becomes
    /// current.
    pub fn kill_at(&mut self, index: usize) -> Result<()> {
        if self.threads.len() <= 1 {
            return Err(HardwareError::LastThread);
        }
        if index >= self.threads.len() {
            return Err(HardwareError::OutOfRange {
                position: index,
                len: self.threads.len(),
            });
        }
        let removed = self.threads.remove(index);
        self.id_chart &= !(1u32 << removed.id);
        if index < self.current {
            self.current -= 1;
        } else if index == self.current {
            self.current = if index == 0 {
                self.threads.len() - 1
            } else {
                index - 1
            };
        }
        Ok(())
    }

    pub fn kill_current(&mut self) -> Result<()> {
        self.kill_at(self.current)
    }

    /// Drops every thread but a fresh first one.
    pub fn reset(&mut self, first: Thread) {
        *self = Self::new(first);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ThreadTable {
        ThreadTable::new(Thread::new(0, 2, 10, 10))
    }

    #[test]
    fn test_fork_keeps_parent_current() {
        let mut threads = table();
        threads.current_mut().heads[HEAD_IP].set_position(5);
        let idx = threads.fork(4).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(threads.current_index(), 0);
        assert_eq!(threads.get(1).unwrap().ip().raw_position(), 5);
        assert_ne!(threads.get(1).unwrap().id(), threads.current().id());
    }

    #[test]
    fn test_fork_respects_limit() {
        let mut threads = table();
        threads.fork(2).unwrap();
        assert_eq!(
            threads.fork(2),
            Err(HardwareError::TooManyThreads { max: 2 })
        );
    }

    #[test]
    fn test_last_thread_cannot_die() {
        let mut threads = table();
        assert_eq!(threads.kill_current(), Err(HardwareError::LastThread));
        assert_eq!(threads.len(), 1);
    }

    #[test]
    fn test_fork_then_kill_restores_state() {
        let mut threads = table();
        threads.fork(10).unwrap();
        threads.set_current(1);
        let before = (threads.len(), threads.current_index());
        let idx = threads.fork(10).unwrap();
        threads.kill_at(idx).unwrap();
        assert_eq!((threads.len(), threads.current_index()), before);
    }

    #[test]
    fn test_kill_current_moves_to_previous() {
        let mut threads = table();
        threads.fork(10).unwrap();
        threads.fork(10).unwrap();
        threads.set_current(0);
        threads.kill_current().unwrap();
        assert_eq!(threads.current_index(), 1);
        threads.set_current(1);
        threads.kill_current().unwrap();
        assert_eq!(threads.current_index(), 0);
    }

    #[test]
    fn test_ids_are_recycled() {
        let mut threads = table();
        threads.fork(10).unwrap();
        threads.fork(10).unwrap();
        threads.kill_at(1).unwrap();
        let idx = threads.fork(10).unwrap();
        assert_eq!(threads.get(idx).unwrap().id(), 1);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut thread = Thread::new(3, 2, 10, 10);
        thread.stacks[1].push(42);
        thread.read_label.push(2);
        thread.owner = Some(GenotypeId::from_u128(9));
        let restored = Thread::from_snapshot(&thread.snapshot(), 2, 10, 10).unwrap();
        assert_eq!(restored, thread);
        assert!(Thread::from_snapshot(&thread.snapshot(), 3, 10, 10).is_err());
    }
}
