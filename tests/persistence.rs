mod common;

use common::{run_updates, WorldBuilder};
use tessera_core::config::AppConfig;
use tessera_lib::model::persistence::{load_json, load_rkyv, save_json, save_rkyv};
use tessera_data::GenotypeId;
use tessera_lib::World;

fn populated_world() -> World {
    let mut world = WorldBuilder::new().with_size(5, 5).with_ancestor().build();
    run_updates(&mut world, 120);
    world
}

#[test]
fn test_lattice_snapshot_rkyv_roundtrip() {
    let world = populated_world();
    let snapshot = world.snapshot();
    let path = std::env::temp_dir().join(format!("tessera_{}.rkyv", std::process::id()));

    save_rkyv(&snapshot, &path).expect("Failed to save rkyv snapshot");
    let loaded = load_rkyv(&path).expect("Failed to load rkyv snapshot");
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded, snapshot);
}

#[test]
fn test_lattice_snapshot_json_roundtrip() {
    let world = populated_world();
    let snapshot = world.snapshot();
    let path = std::env::temp_dir().join(format!("tessera_{}.json", std::process::id()));

    save_json(&snapshot, &path).expect("Failed to save json snapshot");
    let loaded = load_json(&path).expect("Failed to load json snapshot");
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded.cells.len(), snapshot.cells.len());
    assert_eq!(loaded.width, snapshot.width);
}

#[test]
fn test_restored_world_continues_identically() {
    let mut original = populated_world();
    let snapshot = original.snapshot();

    let mut config = original.config.clone();
    config.world.seed = Some(99);
    let mut restored = World::new(config).unwrap();
    restored.restore(&snapshot).unwrap();
    assert_eq!(restored.snapshot(), snapshot);
    assert_eq!(restored.census(), original.census());

    // both keep running without error from the same state
    run_updates(&mut original, 20);
    run_updates(&mut restored, 20);
    assert!(restored.census().occupied >= snapshot.cells.iter().filter(|c| c.organism.is_some()).count());
}

#[test]
fn test_corrupt_archive_rejected() {
    let path = std::env::temp_dir().join(format!("tessera_{}_bad.rkyv", std::process::id()));
    std::fs::write(&path, [0xFFu8; 7]).unwrap();
    assert!(load_rkyv(&path).is_err());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_config_roundtrip_through_toml() {
    let config = AppConfig::from_toml(
        r#"
        [world]
        width = 12
        height = 9
        geometry = "grid"
        birth_method = "random-neighbor"

        [hardware]
        alloc_method = "necro"
        "#,
    )
    .unwrap();
    let world = World::new(config.clone()).unwrap();
    assert_eq!(world.lattice.len(), 108);
    assert_eq!(world.config.fingerprint(), config.fingerprint());
    assert!(AppConfig::from_toml("[world]\nwidth = 0").is_err());
}

#[test]
fn test_injected_host_survives_roundtrip() {
    let mut world = WorldBuilder::new().build();
    let source = world.lattice.cell_at(4, 4).unwrap();
    let host = world.lattice.cell(source).unwrap().faced().unwrap();
    world.inject(host, common::genome(&["val-inc"; 10])).unwrap();
    let code = common::genome(&["nop-A", "val-inc", "val-dec"]);
    let owner = GenotypeId::from_u128(3);
    assert!(world.lattice.deliver_injection(source, &code, owner).unwrap());

    let path = std::env::temp_dir().join(format!("tessera_{}_host.rkyv", std::process::id()));
    save_rkyv(&world.snapshot(), &path).expect("Failed to save rkyv snapshot");
    let loaded = load_rkyv(&path).expect("Failed to load rkyv snapshot");
    let _ = std::fs::remove_file(&path);

    let mut restored = WorldBuilder::new().build();
    restored.restore(&loaded).unwrap();
    let cpu = restored.lattice.cell(host).unwrap().organism().unwrap().cpu();
    assert!(cpu.test_parasite());
    assert_eq!(cpu.memory(1).to_genome(3), code);
    assert!((0..3).all(|i| cpu.memory(1).flags(i).unwrap().injected));
    assert!(!cpu.memory(0).flags(0).unwrap().injected);
    assert_eq!(restored.census().parasitized, 1);
}

#[test]
fn test_restore_rebuilds_genotype_registry() {
    let mut original = WorldBuilder::new()
        .with_size(6, 6)
        .with_config(|c| c.mutation.copy_mut_prob = 0.02)
        .with_ancestor()
        .build();
    run_updates(&mut original, 300);
    let snapshot = original.snapshot();

    let mut restored = WorldBuilder::new().with_size(6, 6).build();
    restored.restore(&snapshot).unwrap();

    assert_eq!(restored.registry.living(), original.registry.living());
    let census = original.census();
    assert_eq!(restored.census().dominant(), census.dominant());
    for (id, count) in census.abundance {
        assert_eq!(original.registry.get(id).unwrap().current_population, count);
        assert_eq!(restored.registry.get(id).unwrap().current_population, count);
    }
}

#[test]
fn test_speculative_waste_survives_roundtrip() {
    let mut world = WorldBuilder::new().with_size(4, 4).with_ancestor().build();
    run_updates(&mut world, 400);
    let snapshot = world.snapshot();
    assert!(snapshot.speculative_waste > 0);

    let mut restored = WorldBuilder::new().build();
    restored.restore(&snapshot).unwrap();
    assert_eq!(restored.lattice.speculative_waste(), world.lattice.speculative_waste());
    run_updates(&mut restored, 1);
    assert!(restored.metrics.speculative_waste() <= restored.lattice.speculative_waste());
}
