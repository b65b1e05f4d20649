use crate::context::{ExecContext, Externals};
use crate::error::Result;
use crate::hardware::{Cpu, HardwareEvent, HardwareSetup};
use std::sync::Arc;
use tessera_data::{Genome, GenotypeId, OrgId, OrganismSnapshot};

/// A living program: its identity, the genome it was born with and the CPU
/// running it.
#[derive(Debug, Clone)]
pub struct Organism {
    pub id: OrgId,
    pub genotype: GenotypeId,
    pub generation: u32,
    genome: Genome,
    cpu: Cpu,
}

impl Organism {
    #[must_use]
    pub fn new(
        id: OrgId,
        genotype: GenotypeId,
        generation: u32,
        setup: Arc<HardwareSetup>,
        genome: Genome,
    ) -> Self {
        Self {
            id,
            genotype,
            generation,
            cpu: Cpu::new(setup, &genome),
            genome,
        }
    }

    /// Genome at birth; the running copy in main memory may drift.
    #[must_use]
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn reset(&mut self, ext: &mut Externals<'_>) {
        self.cpu.reset(ext);
    }

    /// Runs one update's slice; returns instructions executed.
    pub fn process(&mut self, ctx: &mut ExecContext<'_, '_>) -> u64 {
        self.cpu.single_process(ctx)
    }

    pub fn take_events(&mut self) -> Vec<HardwareEvent> {
        self.cpu.take_events()
    }

    #[must_use]
    pub fn is_parasitized(&self) -> bool {
        self.cpu.test_parasite()
    }

    #[must_use]
    pub fn snapshot(&self) -> OrganismSnapshot {
        OrganismSnapshot {
            id: self.id,
            genotype: self.genotype,
            generation: self.generation,
            genome: self.genome.clone(),
            hardware: self.cpu.snapshot(),
        }
    }

    pub fn from_snapshot(setup: Arc<HardwareSetup>, snapshot: &OrganismSnapshot) -> Result<Self> {
        Ok(Self {
            id: snapshot.id,
            genotype: snapshot.genotype,
            generation: snapshot.generation,
            genome: snapshot.genome.clone(),
            cpu: Cpu::from_snapshot(setup, &snapshot.hardware)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_round_trip() {
        let setup = HardwareSetup::standard();
        let genome = Genome::from_ops(&[0, 12, 1]);
        let org = Organism::new(OrgId(4), GenotypeId::from_u128(2), 3, Arc::clone(&setup), genome);
        let restored = Organism::from_snapshot(setup, &org.snapshot()).unwrap();
        assert_eq!(restored.snapshot(), org.snapshot());
        assert_eq!(restored.cpu().genome(), *org.genome());
    }
}
