mod common;

use common::WorldBuilder;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tessera_core::config::BirthMethod;
use tessera_core::context::{DetachedInterface, ExecContext, Externals, NullFeedback, RandomInputs};
use tessera_core::hardware::{Cpu, HardwareEvent, HardwareSetup};
use tessera_core::{DivideFailure, HardwareError};
use tessera_data::{Genome, MutationRates};

fn step_all(cpu: &mut Cpu, steps: usize, rates: MutationRates) -> Vec<HardwareEvent> {
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let (mut inputs, mut feedback) = (RandomInputs, NullFeedback);
    let mut ext = Externals {
        rng: &mut rng,
        inputs: &mut inputs,
        feedback: &mut feedback,
        update: 0,
    };
    let mut cell = DetachedInterface::with_rates(rates);
    let mut ctx = ExecContext::new(&mut ext, &mut cell);
    let mut events = Vec::new();
    for _ in 0..steps {
        cpu.step(&mut ctx);
        events.extend(cpu.take_events());
    }
    events
}

#[test]
fn test_divide_with_short_child_leaves_memory_untouched() {
    // allocate, copy three instructions, divide
    let genome = common::genome(&[
        "SetMemory", "head-move", "nop-C", "inst-copy", "inst-copy", "inst-copy", "Divide",
        "val-inc", "val-inc", "val-inc",
    ]);
    let mut cpu = Cpu::new(HardwareSetup::standard(), &genome);
    let events = step_all(&mut cpu, 5, MutationRates::zero());
    assert!(events.is_empty());
    let before = (cpu.memory(0).clone(), cpu.memory(1).clone());

    let events = step_all(&mut cpu, 1, MutationRates::zero());
    assert!(matches!(
        events.as_slice(),
        [HardwareEvent::DivideFailed(DivideFailure::TooShort { size: 3, min: 8 })]
    ));
    assert_eq!(cpu.memory(0).instructions(), before.0.instructions());
    assert_eq!(cpu.memory(1).instructions(), before.1.instructions());
}

#[test]
fn test_divide_main_reports_invalid_divide() {
    let genome = Genome::from_ops(&[12; 10]);
    let mut cpu = Cpu::new(HardwareSetup::standard(), &genome);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let err = cpu
        .divide_main(0, 1.0, MutationRates::zero(), &mut rng)
        .unwrap_err();
    assert_eq!(err, HardwareError::InvalidDivide(DivideFailure::MainMemory));
}

#[test]
fn test_zero_mutation_child_is_exact_copy() {
    let setup = HardwareSetup::standard();
    let genome = tessera_core::ancestor::default_ancestor(&setup.inst_set).unwrap();
    let mut cpu = Cpu::new(setup, &genome);
    let events = step_all(&mut cpu, 60, MutationRates::zero());
    let children: Vec<&Genome> = events
        .iter()
        .filter_map(|e| match e {
            HardwareEvent::Division { child, .. } => Some(child),
            _ => None,
        })
        .collect();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0], &genome);
}

#[test]
fn test_copy_mutation_changes_child() {
    let setup = HardwareSetup::standard();
    let genome = tessera_core::ancestor::default_ancestor(&setup.inst_set).unwrap();
    let mut cpu = Cpu::new(setup, &genome);
    let rates = MutationRates {
        copy_mut_prob: 1.0,
        ..MutationRates::zero()
    };
    // every copied instruction is replaced, so no exact copy can be born
    let events = step_all(&mut cpu, 60, rates);
    assert!(!events
        .iter()
        .any(|e| matches!(e, HardwareEvent::Division { child, .. } if *child == genome)));
}

#[test]
fn test_cell_rate_override_applies_to_its_resident() {
    let mut world = WorldBuilder::new()
        .with_birth_method(BirthMethod::FacedCell)
        .with_ancestor()
        .build();
    let parent = world.lattice.cell_at(4, 4).unwrap();
    world
        .lattice
        .cell_mut(parent)
        .unwrap()
        .set_mut_rates(MutationRates {
            divide_ins_prob: 1.0,
            ..MutationRates::zero()
        });

    while world.metrics.births() == 0 && world.update_count() < 100 {
        world.update().unwrap();
    }
    let faced = world.lattice.cell(parent).unwrap().faced().unwrap();
    let child = world.lattice.cell(faced).unwrap().organism().unwrap();
    // the override forces one insertion; the world default adds nothing
    assert_eq!(child.genome().len(), 14);
    assert_eq!(world.lattice.cell(faced).unwrap().mut_rates(), MutationRates::zero());
}
