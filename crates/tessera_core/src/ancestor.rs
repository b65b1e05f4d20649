//! The default self-replicator used to seed a world.

use crate::error::Result;
use crate::hardware::InstSet;
use tessera_data::Genome;

/// A minimal copy loop: allocate a daughter space, copy until the trailing
/// `nop-C nop-D` has been copied, then divide.
pub const ANCESTOR: [&str; 13] = [
    "SetMemory",
    "head-move",
    "nop-C",
    "search",
    "inst-copy",
    "if-label",
    "nop-A",
    "nop-B",
    "Divide",
    "head-move",
    "val-inc",
    "nop-C",
    "nop-D",
];

/// Encodes [`ANCESTOR`] for `inst_set`.
pub fn default_ancestor(inst_set: &InstSet) -> Result<Genome> {
    inst_set.parse_genome(&ANCESTOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{DetachedInterface, ExecContext, Externals, NullFeedback, RandomInputs};
    use crate::hardware::{Cpu, HardwareEvent, HardwareSetup};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use tessera_data::MutationRates;

    #[test]
    fn test_ancestor_replicates_exactly() {
        let setup = HardwareSetup::standard();
        let genome = default_ancestor(&setup.inst_set).unwrap();
        let mut cpu = Cpu::new(setup, &genome);

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut inputs = RandomInputs;
        let mut feedback = NullFeedback;
        let mut ext = Externals {
            rng: &mut rng,
            inputs: &mut inputs,
            feedback: &mut feedback,
            update: 0,
        };
        let mut cell = DetachedInterface::with_rates(MutationRates::zero());
        let mut ctx = ExecContext::new(&mut ext, &mut cell);

        let mut births = Vec::new();
        let mut steps = 0;
        while births.len() < 2 && steps < 200 {
            cpu.step(&mut ctx);
            steps += 1;
            for event in cpu.take_events() {
                match event {
                    HardwareEvent::Division { child, .. } => births.push((steps, child)),
                    other => panic!("unexpected event {other:?}"),
                }
            }
        }

        assert_eq!(births.len(), 2);
        assert!(births[0].0 <= 50, "first birth took {} steps", births[0].0);
        for (_, child) in &births {
            assert_eq!(*child, genome);
        }
        assert_eq!(cpu.genome(), genome);
    }
}
