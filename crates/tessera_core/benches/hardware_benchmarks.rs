use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tessera_core::ancestor::default_ancestor;
use tessera_core::config::Geometry;
use tessera_core::context::{
    DetachedInterface, ExecContext, Externals, NullFeedback, RandomInputs,
};
use tessera_core::hardware::{Cpu, HardwareSetup};
use tessera_core::lattice::Lattice;
use tessera_data::{CellId, MutationRates};

fn bench_ancestor_process(c: &mut Criterion) {
    let setup = HardwareSetup::standard();
    let genome = default_ancestor(&setup.inst_set).unwrap();
    let mut cpu = Cpu::new(setup, &genome);
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let (mut inputs, mut feedback) = (RandomInputs, NullFeedback);
    let mut cell = DetachedInterface::default();

    c.bench_function("ancestor_single_process", |b| {
        b.iter(|| {
            let mut ext = Externals {
                rng: &mut rng,
                inputs: &mut inputs,
                feedback: &mut feedback,
                update: 0,
            };
            let mut ctx = ExecContext::new(&mut ext, &mut cell);
            let executed = cpu.single_process(&mut ctx);
            cpu.take_events();
            black_box(executed)
        })
    });
}

fn bench_neighborhood(c: &mut Criterion) {
    let lattice = Lattice::new(100, 100, Geometry::Torus, MutationRates::zero()).unwrap();

    c.bench_function("neighboring_cells_depth_3", |b| {
        b.iter(|| black_box(lattice.neighboring_cells(CellId(5050), 3).unwrap().len()))
    });
}

fn bench_census(c: &mut Criterion) {
    let mut lattice = Lattice::new(100, 100, Geometry::Torus, MutationRates::zero()).unwrap();
    let setup = HardwareSetup::standard();
    let genome = default_ancestor(&setup.inst_set).unwrap();
    for i in (0..lattice.len()).step_by(3) {
        let org = tessera_core::Organism::new(
            tessera_core::OrgId(i as u64),
            tessera_core::GenotypeId::from_u128((i % 7) as u128),
            0,
            std::sync::Arc::clone(&setup),
            genome.clone(),
        );
        lattice.insert_organism(CellId(i), org).unwrap();
    }

    c.bench_function("census_10k_cells", |b| b.iter(|| black_box(lattice.census())));
}

criterion_group!(benches, bench_ancestor_process, bench_neighborhood, bench_census);
criterion_main!(benches);
