//! Mutation operators applied to genomes at copy and divide time.

use crate::hardware::InstSet;
use rand::{Rng, RngCore};
use tessera_data::{Genome, Instruction, MutationRates};

/// Bernoulli trial that tolerates probabilities outside `[0, 1]`.
#[inline]
pub fn chance(rng: &mut dyn RngCore, p: f64) -> bool {
    p > 0.0 && (p >= 1.0 || rng.gen::<f64>() < p)
}

/// Counts of what a divide-time mutation pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationSummary {
    pub substitutions: u32,
    pub insertions: u32,
    pub deletions: u32,
}

impl MutationSummary {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.substitutions + self.insertions + self.deletions
    }
}

/// Mutation operators for genomes.
pub trait MutationLogic {
    /// One point substitution, one insertion and one deletion, each with its
    /// own probability scaled by `multiplier`. Length stays in
    /// `[min_len, max_len]`.
    fn mutate_on_divide(
        &mut self,
        rates: &MutationRates,
        multiplier: f64,
        inst_set: &InstSet,
        min_len: usize,
        max_len: usize,
        rng: &mut dyn RngCore,
    ) -> MutationSummary;
}

impl MutationLogic for Genome {
    fn mutate_on_divide(
        &mut self,
        rates: &MutationRates,
        multiplier: f64,
        inst_set: &InstSet,
        min_len: usize,
        max_len: usize,
        rng: &mut dyn RngCore,
    ) -> MutationSummary {
        let mut summary = MutationSummary::default();

        if !self.is_empty() && chance(rng, rates.divide_mut_prob * multiplier) {
            let pos = rng.gen_range(0..self.len());
            self[pos] = inst_set.random_inst(rng);
            summary.substitutions += 1;
        }

        if self.len() < max_len && chance(rng, rates.divide_ins_prob * multiplier) {
            let pos = rng.gen_range(0..=self.len());
            let inst = inst_set.random_inst(rng);
            self.insert(pos, inst);
            summary.insertions += 1;
        }

        if self.len() > min_len && chance(rng, rates.divide_del_prob * multiplier) {
            let pos = rng.gen_range(0..self.len());
            self.remove(pos);
            summary.deletions += 1;
        }

        summary
    }
}

/// Hex and digest helpers for genomes, mirroring how genotypes are
/// exchanged as text.
pub trait GenomeLogic {
    fn to_hex(&self) -> String;
    fn from_hex(hex_str: &str) -> anyhow::Result<Self>
    where
        Self: Sized;
    /// SHA-256 of the opcode sequence; payloads are ignored.
    fn digest(&self) -> String;
}

impl GenomeLogic for Genome {
    fn to_hex(&self) -> String {
        hex::encode(self.ops())
    }

    fn from_hex(hex_str: &str) -> anyhow::Result<Self> {
        let bytes = hex::decode(hex_str)?;
        Ok(bytes.into_iter().map(Instruction::new).collect())
    }

    fn digest(&self) -> String {
        use sha2::{Digest, Sha256};
        hex::encode(Sha256::digest(self.ops()))
    }
}
