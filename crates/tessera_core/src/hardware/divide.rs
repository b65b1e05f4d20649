use crate::error::{DivideFailure, HardwareError, Result};
use crate::hardware::cpu::Cpu;
use crate::hardware::{HardwareEvent, HEAD_WRITE};
use crate::mutation::MutationLogic;
use rand::RngCore;
use tessera_data::{Genome, MutationRates};

impl Cpu {
    /// Length of the offspring held in `space`: up to the WRITE head when it
    /// sits in that space, otherwise the whole space.
    #[must_use]
    pub fn child_size(&self, space: usize) -> usize {
        let space = self.setup().normalize_space(space);
        let len = self.memory[space].len();
        let write = self.head(HEAD_WRITE);
        if self.setup().normalize_space(write.space()) != space {
            return len;
        }
        match write.position(len) {
            Ok(0) | Err(_) => len,
            Ok(pos) => pos,
        }
    }

    fn check_divide(&self, space: usize, child_size: usize) -> std::result::Result<(), DivideFailure> {
        let config = &self.setup().divide;
        let (min, max) = (config.min_genome_len, config.max_genome_len);
        if space == 0 {
            return Err(DivideFailure::MainMemory);
        }
        if child_size < min {
            return Err(DivideFailure::TooShort {
                size: child_size,
                min,
            });
        }
        if child_size > max {
            return Err(DivideFailure::TooLong {
                size: child_size,
                max,
            });
        }
        let parent_size = self.memory[0].len();
        if parent_size < min || parent_size > max {
            return Err(DivideFailure::ParentSize {
                size: parent_size,
                min,
                max,
            });
        }
        let range = config.child_size_range;
        if child_size as f64 > parent_size as f64 * range
            || (child_size as f64) * range < parent_size as f64
        {
            return Err(DivideFailure::SizeRatio {
                child: child_size,
                parent: parent_size,
            });
        }
        let copied = self.memory[space].count_copied(child_size);
        let required = (child_size as f64 * config.min_copied_fraction).ceil() as usize;
        if copied < required {
            return Err(DivideFailure::TooFewCopied { copied, required });
        }
        let executed = self.memory[0].count_executed();
        let required = (parent_size as f64 * config.min_executed_fraction).ceil() as usize;
        if executed < required {
            return Err(DivideFailure::TooFewExecuted { executed, required });
        }
        Ok(())
    }

    /// Splits the offspring in `space` off the organism.
    ///
    /// The child is validated before anything changes, so a rejected divide
    /// leaves every memory space as it was. On success the child receives
    /// divide-time mutations, the space is emptied, the dividing thread's
    /// copy heads return to the start of main memory, and a
    /// [`HardwareEvent::Division`] is queued.
    pub fn divide_main(
        &mut self,
        space: usize,
        mut_multiplier: f64,
        rates: MutationRates,
        rng: &mut dyn RngCore,
    ) -> Result<Genome> {
        let space = self.setup().normalize_space(space);
        let child_size = self.child_size(space);
        self.check_divide(space, child_size)
            .map_err(HardwareError::InvalidDivide)?;

        let setup = std::sync::Arc::clone(self.setup());
        let mut child = self.memory[space].to_genome(child_size);
        let summary = child.mutate_on_divide(
            &rates,
            mut_multiplier,
            &setup.inst_set,
            setup.divide.min_genome_len,
            setup.divide.max_genome_len,
            rng,
        );

        self.memory[space].clear();
        let thread = self.threads.current_mut();
        thread.reset_copy_heads();
        thread.read_label.clear();

        tracing::trace!(
            size = child.len(),
            mutations = summary.total(),
            "divide succeeded"
        );
        self.events.push(HardwareEvent::Division {
            child: child.clone(),
            mut_rates: rates,
        });
        Ok(child)
    }
}
