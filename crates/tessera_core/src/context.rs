//! Collaborators the CPU talks to while it executes.
//!
//! The environment, task bookkeeping and the lattice cell stay outside the
//! hardware. A CPU only sees them through the traits here, bundled into an
//! [`ExecContext`] for the duration of one call.

use rand::{Rng, RngCore};
use tessera_data::{CellData, CellId, MutationRates};

/// Supplies input values when a CPU resets.
pub trait InputFeed {
    fn generate(&mut self, count: usize, rng: &mut dyn RngCore) -> Vec<i32>;
}

/// Receives the values organisms output, together with the inputs they
/// were given. Structural failures travel as hardware events instead.
pub trait TaskFeedback {
    /// Called by the IO instruction with the value taken off the stack.
    fn on_output(&mut self, value: i32, inputs: &[i32]);
}

/// What a CPU may ask of the cell hosting it.
pub trait OrganismInterface {
    fn cell_id(&self) -> Option<CellId>;
    /// 3-bit direction code of the faced neighbor.
    fn facing(&self) -> i32;
    /// Clockwise direction (0 = north) of the faced neighbor.
    fn faced_dir(&self) -> i32;
    /// Rotates the facing by `steps` connections; negative turns left.
    fn rotate(&mut self, steps: i32) -> bool;
    fn occupied_neighbors(&self) -> usize;
    fn mut_rates(&self) -> MutationRates;
    fn cell_data(&self) -> CellData;
    fn set_cell_data(&mut self, contents: i32, update: u64);
}

/// Driver-owned resources shared by every organism in an update.
pub struct Externals<'a> {
    pub rng: &'a mut dyn RngCore,
    pub inputs: &'a mut dyn InputFeed,
    pub feedback: &'a mut dyn TaskFeedback,
    pub update: u64,
}

/// Everything one CPU call may touch.
pub struct ExecContext<'a, 'b> {
    pub ext: &'a mut Externals<'b>,
    pub interface: &'a mut dyn OrganismInterface,
}

impl<'a, 'b> ExecContext<'a, 'b> {
    pub fn new(ext: &'a mut Externals<'b>, interface: &'a mut dyn OrganismInterface) -> Self {
        Self { ext, interface }
    }
}

/// Uniform random inputs in the low 24 bits, the way task environments
/// usually seed their registers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomInputs;

impl InputFeed for RandomInputs {
    fn generate(&mut self, count: usize, rng: &mut dyn RngCore) -> Vec<i32> {
        (0..count)
            .map(|_| rng.gen_range(0..(1 << 24)))
            .collect()
    }
}

/// Fixed inputs, repeated as needed.
#[derive(Debug, Clone, Default)]
pub struct FixedInputs(pub Vec<i32>);

impl InputFeed for FixedInputs {
    fn generate(&mut self, count: usize, _rng: &mut dyn RngCore) -> Vec<i32> {
        if self.0.is_empty() {
            return vec![0; count];
        }
        self.0.iter().copied().cycle().take(count).collect()
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFeedback;

impl TaskFeedback for NullFeedback {
    fn on_output(&mut self, _value: i32, _inputs: &[i32]) {}
}

/// Records every output; useful in tests and for simple task checks.
#[derive(Debug, Clone, Default)]
pub struct OutputLog {
    pub outputs: Vec<i32>,
}

impl TaskFeedback for OutputLog {
    fn on_output(&mut self, value: i32, _inputs: &[i32]) {
        self.outputs.push(value);
    }
}

/// Stand-in cell for a CPU that runs outside any lattice.
#[derive(Debug, Clone, Default)]
pub struct DetachedInterface {
    pub facing: i32,
    pub rotation: i32,
    pub occupied: usize,
    pub rates: MutationRates,
    pub data: CellData,
}

impl DetachedInterface {
    #[must_use]
    pub fn with_rates(rates: MutationRates) -> Self {
        Self {
            rates,
            ..Self::default()
        }
    }
}

impl OrganismInterface for DetachedInterface {
    fn cell_id(&self) -> Option<CellId> {
        None
    }

    fn facing(&self) -> i32 {
        self.facing
    }

    fn faced_dir(&self) -> i32 {
        self.rotation.rem_euclid(8)
    }

    fn rotate(&mut self, steps: i32) -> bool {
        self.rotation += steps;
        true
    }

    fn occupied_neighbors(&self) -> usize {
        self.occupied
    }

    fn mut_rates(&self) -> MutationRates {
        self.rates
    }

    fn cell_data(&self) -> CellData {
        self.data
    }

    fn set_cell_data(&mut self, contents: i32, update: u64) {
        self.data.contents = contents;
        self.data.update = Some(update);
    }
}
