//! Configuration management for simulation parameters.
//!
//! This module provides strongly-typed configuration structures that map to
//! the `config.toml` file. Every section has defaults, so a config file only
//! needs to name what it changes.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! [world]
//! width = 60
//! height = 60
//! geometry = "torus"
//! birth_method = "prefer-empty"
//! seed = 42
//!
//! [hardware]
//! max_threads = 10
//! alloc_method = "necro"
//!
//! [mutation]
//! copy_mut_prob = 0.0075
//! ```

use crate::hardware::inst_set::DEFAULT_INSTRUCTIONS;
use serde::{Deserialize, Serialize};
use tessera_data::MutationRates;

/// Lattice wiring at the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Geometry {
    /// Edges wrap around in both directions.
    #[default]
    Torus,
    /// Bounded grid; edge cells have fewer neighbors.
    Grid,
}

/// Where an offspring goes relative to its parent's cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BirthMethod {
    /// The cell the parent is facing.
    FacedCell,
    /// A uniformly random neighbor, occupied or not.
    RandomNeighbor,
    /// A random empty neighbor, falling back to any neighbor.
    #[default]
    PreferEmpty,
}

/// How freshly allocated memory slots are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AllocMethod {
    /// Fill with the configured default instruction.
    #[default]
    Default,
    /// Reuse whatever dead content the space held before it shrank.
    Necro,
    /// Fill with random instructions.
    Random,
}

/// World-level configuration: lattice shape and placement.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WorldConfig {
    pub width: i32,
    pub height: i32,
    pub geometry: Geometry,
    pub birth_method: BirthMethod,
    pub seed: Option<u64>,
    /// Updates between periodic summary log lines.
    pub log_interval: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 60,
            height: 60,
            geometry: Geometry::Torus,
            birth_method: BirthMethod::PreferEmpty,
            seed: None,
            log_interval: 100,
        }
    }
}

/// One entry of the instruction set table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InstructionConfig {
    pub name: String,
    /// Quanta an instruction must wait before each execution (0 or 1 = free).
    #[serde(default)]
    pub cost: u32,
    /// Quanta paid once, the first time the instruction is reached.
    #[serde(default)]
    pub ft_cost: u32,
}

impl InstructionConfig {
    #[must_use]
    pub fn free(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cost: 0,
            ft_cost: 0,
        }
    }
}

/// Virtual CPU layout and scheduling.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct HardwareConfig {
    pub memory_spaces: usize,
    pub local_stacks: usize,
    pub global_stacks: usize,
    pub stack_depth: usize,
    pub max_label_size: usize,
    pub max_threads: usize,
    /// Per-thread instruction credit indexed by thread count. Empty means
    /// `1 / sqrt(n)`.
    pub thread_slicing: Vec<f64>,
    pub instruction_costs: bool,
    pub alloc_method: AllocMethod,
    pub default_instruction: String,
    pub instructions: Vec<InstructionConfig>,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            memory_spaces: 4,
            local_stacks: 2,
            global_stacks: 2,
            stack_depth: 10,
            max_label_size: 10,
            max_threads: 10,
            thread_slicing: Vec::new(),
            instruction_costs: false,
            alloc_method: AllocMethod::Default,
            default_instruction: "nop-A".to_string(),
            instructions: DEFAULT_INSTRUCTIONS
                .iter()
                .map(|&(name, _)| InstructionConfig::free(name))
                .collect(),
        }
    }
}

impl HardwareConfig {
    /// Resolved slicing table with `max_threads + 1` entries.
    #[must_use]
    pub fn slicing_table(&self) -> Vec<f64> {
        if !self.thread_slicing.is_empty() {
            return self.thread_slicing.clone();
        }
        (0..=self.max_threads)
            .map(|n| if n == 0 { 0.0 } else { 1.0 / (n as f64).sqrt() })
            .collect()
    }
}

/// Divide validation and copy error correction.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DivideConfig {
    pub min_genome_len: usize,
    pub max_genome_len: usize,
    /// Child may be at most this factor larger or smaller than the parent.
    pub child_size_range: f64,
    pub min_copied_fraction: f64,
    pub min_executed_fraction: f64,
    /// Divisor applied to the copy mutation rate by `inst-copy-ec`.
    pub error_correct_reduction: f64,
    /// Extra attempts `inst-copy-ec` makes after a detected copy error.
    pub error_correct_retries: u32,
}

impl Default for DivideConfig {
    fn default() -> Self {
        Self {
            min_genome_len: 8,
            max_genome_len: 2048,
            child_size_range: 2.0,
            min_copied_fraction: 0.5,
            min_executed_fraction: 0.5,
            error_correct_reduction: 2.0,
            error_correct_retries: 3,
        }
    }
}

/// Global mutation rates; cells start from a copy of these.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MutationConfig {
    pub copy_mut_prob: f64,
    pub divide_mut_prob: f64,
    pub divide_ins_prob: f64,
    pub divide_del_prob: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            copy_mut_prob: 0.0075,
            divide_mut_prob: 0.0,
            divide_ins_prob: 0.05,
            divide_del_prob: 0.05,
        }
    }
}

impl MutationConfig {
    #[must_use]
    pub fn rates(&self) -> MutationRates {
        MutationRates {
            copy_mut_prob: self.copy_mut_prob,
            divide_mut_prob: self.divide_mut_prob,
            divide_ins_prob: self.divide_ins_prob,
            divide_del_prob: self.divide_del_prob,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Size of each organism's input buffer.
    pub num_inputs: usize,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self { num_inputs: 3 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub world: WorldConfig,
    pub hardware: HardwareConfig,
    pub divide: DivideConfig,
    pub mutation: MutationConfig,
    pub environment: EnvironmentConfig,
}

impl AppConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` with a
    /// description of the first validation failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        // World validation
        anyhow::ensure!(self.world.width > 0, "World width must be positive");
        anyhow::ensure!(self.world.height > 0, "World height must be positive");
        anyhow::ensure!(
            self.world.width <= 4096 && self.world.height <= 4096,
            "World too large (max 4096x4096)"
        );
        anyhow::ensure!(
            self.world.width * self.world.height > 1,
            "World needs at least two cells"
        );

        // Hardware validation
        let hw = &self.hardware;
        anyhow::ensure!(hw.memory_spaces >= 2, "Need at least two memory spaces");
        anyhow::ensure!(hw.local_stacks > 0, "Need at least one local stack");
        anyhow::ensure!(hw.stack_depth > 0, "Stack depth must be positive");
        anyhow::ensure!(hw.max_label_size > 0, "Max label size must be positive");
        anyhow::ensure!(
            hw.max_threads > 0 && hw.max_threads <= 32,
            "Max threads must be in [1, 32]"
        );
        anyhow::ensure!(
            hw.thread_slicing.is_empty() || hw.thread_slicing.len() == hw.max_threads + 1,
            "Thread slicing table needs max_threads + 1 entries"
        );
        anyhow::ensure!(
            hw.thread_slicing.iter().all(|s| s.is_finite() && *s >= 0.0),
            "Thread slicing entries must be non-negative"
        );
        anyhow::ensure!(
            !hw.instructions.is_empty() && hw.instructions.len() <= 256,
            "Instruction set must hold 1..=256 instructions"
        );
        anyhow::ensure!(
            hw.instructions.iter().any(|i| i.name == hw.default_instruction),
            "Default instruction {} is not in the instruction set",
            hw.default_instruction
        );

        // Divide validation
        let div = &self.divide;
        anyhow::ensure!(div.min_genome_len > 0, "Min genome length must be positive");
        anyhow::ensure!(
            div.min_genome_len <= div.max_genome_len,
            "Min genome length exceeds max"
        );
        anyhow::ensure!(div.child_size_range >= 1.0, "Child size range must be >= 1.0");
        anyhow::ensure!(
            (0.0..=1.0).contains(&div.min_copied_fraction),
            "Min copied fraction must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&div.min_executed_fraction),
            "Min executed fraction must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            div.error_correct_reduction >= 1.0,
            "Error correction reduction must be >= 1.0"
        );

        // Mutation validation
        for (name, p) in [
            ("Copy", self.mutation.copy_mut_prob),
            ("Divide substitution", self.mutation.divide_mut_prob),
            ("Divide insertion", self.mutation.divide_ins_prob),
            ("Divide deletion", self.mutation.divide_del_prob),
        ] {
            anyhow::ensure!(
                (0.0..=1.0).contains(&p),
                "{name} mutation probability must be in [0.0, 1.0]"
            );
        }

        anyhow::ensure!(
            self.environment.num_inputs > 0,
            "Number of inputs must be positive"
        );

        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.hardware).as_bytes());
        hasher.update(format!("{:?}", self.divide).as_bytes());
        hasher.update(format!("{:?}", self.mutation).as_bytes());
        hasher.update(format!("{:?}", self.environment).as_bytes());
        hex::encode(hasher.finalize())
    }
}
