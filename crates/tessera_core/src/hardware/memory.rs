use crate::error::{HardwareError, Result};
use tessera_data::{Genome, Instruction, MemorySnapshot};

/// Per-instruction bookkeeping kept alongside a memory space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstFlags {
    /// Written by a copy instruction.
    pub copied: bool,
    /// Changed by a mutation or an explicit write.
    pub mutated: bool,
    /// Fetched for execution (or consumed as a modifier/label).
    pub executed: bool,
    /// Arrived through parasite injection.
    pub injected: bool,
}

/// A resizable instruction buffer with a parallel flag array.
///
/// The two arrays always have the same length. Content cut off by shrinking
/// is remembered so the necro allocation strategy can bring it back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySpace {
    instructions: Vec<Instruction>,
    flags: Vec<InstFlags>,
    dead: Vec<Instruction>,
}

impl MemorySpace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_genome(genome: &Genome) -> Self {
        Self {
            instructions: genome.instructions.clone(),
            flags: vec![InstFlags::default(); genome.len()],
            dead: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    fn check(&self, position: usize) -> Result<()> {
        if position < self.len() {
            Ok(())
        } else {
            Err(HardwareError::OutOfRange {
                position,
                len: self.len(),
            })
        }
    }

    pub fn read(&self, position: usize) -> Result<Instruction> {
        self.check(position)?;
        Ok(self.instructions[position])
    }

    /// Overwrites one instruction and marks it as modified.
    pub fn write(&mut self, position: usize, inst: Instruction) -> Result<()> {
        self.check(position)?;
        self.instructions[position] = inst;
        self.flags[position].mutated = true;
        Ok(())
    }

    /// Writes an instruction as the result of a copy.
    pub fn copy_in(&mut self, position: usize, inst: Instruction, mutated: bool) -> Result<()> {
        self.check(position)?;
        self.instructions[position] = inst;
        let flags = &mut self.flags[position];
        flags.copied = true;
        flags.mutated = mutated;
        Ok(())
    }

    /// Inserts before `position`; `position == len` appends.
    pub fn insert(&mut self, position: usize, inst: Instruction) -> Result<()> {
        if position > self.len() {
            return Err(HardwareError::OutOfRange {
                position,
                len: self.len(),
            });
        }
        self.instructions.insert(position, inst);
        self.flags.insert(
            position,
            InstFlags {
                mutated: true,
                ..InstFlags::default()
            },
        );
        Ok(())
    }

    pub fn remove(&mut self, position: usize) -> Result<Instruction> {
        self.check(position)?;
        self.flags.remove(position);
        Ok(self.instructions.remove(position))
    }

    pub fn flags(&self, position: usize) -> Result<InstFlags> {
        self.check(position)?;
        Ok(self.flags[position])
    }

    pub fn mark_executed(&mut self, position: usize) -> Result<()> {
        self.check(position)?;
        self.flags[position].executed = true;
        Ok(())
    }

    pub fn mark_injected(&mut self) {
        for flags in &mut self.flags {
            flags.injected = true;
        }
    }

    /// Resets every flag without touching instructions.
    pub fn clear_flags(&mut self) {
        self.flags.fill(InstFlags::default());
    }

    fn shrink(&mut self, new_len: usize) {
        let mut tail = self.instructions.split_off(new_len);
        tail.append(&mut self.dead);
        self.dead = tail;
        self.flags.truncate(new_len);
    }

    /// Resizes, filling new slots with `fill`.
    pub fn resize(&mut self, new_len: usize, fill: Instruction) {
        self.resize_with(new_len, || fill);
    }

    /// Resizes, drawing each new slot from `source`.
    pub fn resize_with<F: FnMut() -> Instruction>(&mut self, new_len: usize, mut source: F) {
        let len = self.len();
        if new_len <= len {
            self.shrink(new_len);
            return;
        }
        let grow = new_len - len;
        self.dead.drain(..grow.min(self.dead.len()));
        self.instructions.extend((0..grow).map(|_| source()));
        self.flags.resize(new_len, InstFlags::default());
    }

    /// Resizes, reviving content cut off by earlier shrinks before falling
    /// back to `fill`. Revived slots come back with clean flags.
    pub fn resize_necro(&mut self, new_len: usize, fill: Instruction) {
        let len = self.len();
        if new_len <= len {
            self.shrink(new_len);
            return;
        }
        let grow = new_len - len;
        let revived = grow.min(self.dead.len());
        self.instructions.extend(self.dead.drain(..revived));
        self.instructions
            .extend(std::iter::repeat(fill).take(grow - revived));
        self.flags.resize(new_len, InstFlags::default());
    }

    /// Empties the space; its content becomes dead filler.
    pub fn clear(&mut self) {
        self.shrink(0);
    }

    /// Copies the first `len` instructions out as a genome.
    #[must_use]
    pub fn to_genome(&self, len: usize) -> Genome {
        Genome::new(self.instructions[..len.min(self.len())].to_vec())
    }

    #[must_use]
    pub fn count_copied(&self, len: usize) -> usize {
        self.flags.iter().take(len).filter(|f| f.copied).count()
    }

    #[must_use]
    pub fn count_executed(&self) -> usize {
        self.flags.iter().filter(|f| f.executed).count()
    }

    #[must_use]
    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            instructions: self.instructions.clone(),
            copied: self.flags.iter().map(|f| f.copied).collect(),
            mutated: self.flags.iter().map(|f| f.mutated).collect(),
            executed: self.flags.iter().map(|f| f.executed).collect(),
            injected: self.flags.iter().map(|f| f.injected).collect(),
        }
    }

    pub fn from_snapshot(snapshot: &MemorySnapshot) -> Result<Self> {
        let len = snapshot.instructions.len();
        if snapshot.copied.len() != len
            || snapshot.mutated.len() != len
            || snapshot.executed.len() != len
            || snapshot.injected.len() != len
        {
            return Err(HardwareError::InvalidSnapshot(
                "memory flag arrays differ in length".to_string(),
            ));
        }
        let flags = (0..len)
            .map(|i| InstFlags {
                copied: snapshot.copied[i],
                mutated: snapshot.mutated[i],
                executed: snapshot.executed[i],
                injected: snapshot.injected[i],
            })
            .collect();
        Ok(Self {
            instructions: snapshot.instructions.clone(),
            flags,
            dead: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space(ops: &[u8]) -> MemorySpace {
        MemorySpace::from_genome(&Genome::from_ops(ops))
    }

    #[test]
    fn test_resize_preserves_and_resets_new_flags() {
        let mut mem = space(&[1, 2, 3]);
        mem.write(2, Instruction::new(9)).unwrap();
        mem.resize(5, Instruction::new(0));
        assert_eq!(mem.len(), 5);
        assert_eq!(mem.read(2).unwrap(), Instruction::new(9));
        assert!(mem.flags(2).unwrap().mutated);
        assert_eq!(mem.read(4).unwrap(), Instruction::new(0));
        assert_eq!(mem.flags(4).unwrap(), InstFlags::default());
    }

    #[test]
    fn test_out_of_range_is_reported() {
        let mut mem = space(&[1]);
        assert!(matches!(
            mem.read(1),
            Err(HardwareError::OutOfRange { position: 1, len: 1 })
        ));
        assert!(mem.write(3, Instruction::new(0)).is_err());
        assert!(mem.insert(2, Instruction::new(0)).is_err());
        assert!(mem.insert(1, Instruction::new(7)).is_ok());
        assert_eq!(mem.len(), 2);
    }

    #[test]
    fn test_insert_remove_keep_arrays_aligned() {
        let mut mem = space(&[1, 2, 3]);
        mem.insert(1, Instruction::new(8)).unwrap();
        assert_eq!(mem.instructions().len(), 4);
        assert!(mem.flags(1).unwrap().mutated);
        assert!(!mem.flags(2).unwrap().mutated);
        assert_eq!(mem.remove(0).unwrap(), Instruction::new(1));
        assert_eq!(mem.snapshot().copied.len(), mem.len());
    }

    #[test]
    fn test_necro_revives_dead_content() {
        let mut mem = space(&[1, 2, 3, 4]);
        mem.copy_in(3, Instruction::new(4), false).unwrap();
        mem.resize(2, Instruction::new(0));
        mem.resize_necro(5, Instruction::new(0));
        assert_eq!(mem.instructions()[..4], Genome::from_ops(&[1, 2, 3, 4])[..]);
        assert_eq!(mem.read(4).unwrap(), Instruction::new(0));
        assert!(!mem.flags(3).unwrap().copied);
    }

    #[test]
    fn test_default_growth_discards_dead_content() {
        let mut mem = space(&[1, 2, 3]);
        mem.clear();
        assert!(mem.is_empty());
        mem.resize(1, Instruction::new(0));
        mem.resize_necro(3, Instruction::new(0));
        assert_eq!(mem.instructions(), &Genome::from_ops(&[0, 2, 3])[..]);
    }

    #[test]
    fn test_copied_and_executed_counts() {
        let mut mem = space(&[0, 0, 0, 0]);
        mem.copy_in(0, Instruction::new(1), false).unwrap();
        mem.copy_in(1, Instruction::new(2), true).unwrap();
        mem.mark_executed(3).unwrap();
        assert_eq!(mem.count_copied(4), 2);
        assert_eq!(mem.count_copied(1), 1);
        assert_eq!(mem.count_executed(), 1);
    }

    #[test]
    fn test_snapshot_rejects_ragged_flags() {
        let mut snapshot = space(&[1, 2]).snapshot();
        snapshot.executed.pop();
        assert!(MemorySpace::from_snapshot(&snapshot).is_err());
    }
}
