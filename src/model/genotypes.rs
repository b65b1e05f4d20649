use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tessera_core::GenomeLogic;
use tessera_data::{Genome, GenotypeId};

/// Bookkeeping for one distinct genome.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenotypeRecord {
    pub id: GenotypeId,
    pub parent: Option<GenotypeId>,
    pub length: usize,
    pub first_update: u64,
    pub total_produced: usize,
    pub current_population: usize,
    pub peak_population: usize,
}

/// Every genotype seen during a run, keyed by genome digest.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct GenotypeRegistry {
    by_digest: HashMap<String, GenotypeId>,
    pub records: HashMap<GenotypeId, GenotypeRecord>,
}

impl GenotypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a new organism carrying `genome` and returns its genotype.
    ///
    /// Ids for new genotypes are drawn from `rng` so seeded runs agree.
    pub fn record_birth(
        &mut self,
        genome: &Genome,
        parent: Option<GenotypeId>,
        update: u64,
        rng: &mut dyn RngCore,
    ) -> GenotypeId {
        let digest = genome.digest();
        let id = *self
            .by_digest
            .entry(digest)
            .or_insert_with(|| GenotypeId::from_u128(rng.gen()));
        self.count(id, genome, parent, update);
        id
    }

    /// Re-registers an organism restored from a snapshot under the genotype
    /// id it was saved with. Parents of restored genotypes are unknown.
    pub fn record_restored(&mut self, genome: &Genome, id: GenotypeId, update: u64) {
        self.by_digest.entry(genome.digest()).or_insert(id);
        self.count(id, genome, None, update);
    }

    fn count(&mut self, id: GenotypeId, genome: &Genome, parent: Option<GenotypeId>, update: u64) {
        let record = self.records.entry(id).or_insert_with(|| GenotypeRecord {
            id,
            parent,
            length: genome.len(),
            first_update: update,
            total_produced: 0,
            current_population: 0,
            peak_population: 0,
        });
        record.total_produced += 1;
        record.current_population += 1;
        record.peak_population = record.peak_population.max(record.current_population);
    }

    pub fn record_death(&mut self, id: GenotypeId) {
        if let Some(record) = self.records.get_mut(&id) {
            record.current_population = record.current_population.saturating_sub(1);
        }
    }

    #[must_use]
    pub fn get(&self, id: GenotypeId) -> Option<&GenotypeRecord> {
        self.records.get(&id)
    }

    #[must_use]
    pub fn living(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.current_population > 0)
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
