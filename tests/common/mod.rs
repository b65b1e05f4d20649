pub mod macros;

use tessera_core::config::{AppConfig, BirthMethod, Geometry};
use tessera_core::hardware::InstSet;
use tessera_data::{CellId, Genome};
use tessera_lib::World;

type WorldMod = Box<dyn FnOnce(&mut World)>;

#[allow(dead_code)]
pub struct WorldBuilder {
    config: AppConfig,
    organisms: Vec<(CellId, Genome)>,
    mods: Vec<WorldMod>,
}

#[allow(dead_code)]
impl WorldBuilder {
    /// A small seeded torus with mutation switched off.
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.world.width = 8;
        config.world.height = 8;
        config.world.seed = Some(42);
        config.world.log_interval = 0;
        config.mutation.copy_mut_prob = 0.0;
        config.mutation.divide_mut_prob = 0.0;
        config.mutation.divide_ins_prob = 0.0;
        config.mutation.divide_del_prob = 0.0;
        Self {
            config,
            organisms: Vec::new(),
            mods: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.world.seed = Some(seed);
        self
    }

    pub fn with_size(mut self, width: i32, height: i32) -> Self {
        self.config.world.width = width;
        self.config.world.height = height;
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.config.world.geometry = geometry;
        self
    }

    pub fn with_birth_method(mut self, method: BirthMethod) -> Self {
        self.config.world.birth_method = method;
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        modifier(&mut self.config);
        self
    }

    pub fn with_organism(mut self, cell: usize, genome: Genome) -> Self {
        self.organisms.push((CellId(cell), genome));
        self
    }

    pub fn with_ancestor(mut self) -> Self {
        self.mods.push(Box::new(|world| {
            world
                .inject_ancestor()
                .expect("Failed to inject ancestor in test builder");
        }));
        self
    }

    pub fn build(self) -> World {
        let mut world = World::new(self.config).expect("Failed to create world in test builder");
        for (cell, genome) in self.organisms {
            world
                .inject(cell, genome)
                .expect("Failed to place organism in test builder");
        }
        for modifier in self.mods {
            modifier(&mut world);
        }
        world
    }
}

#[allow(dead_code)]
pub fn genome(names: &[&str]) -> Genome {
    InstSet::standard()
        .parse_genome(names)
        .expect("unknown instruction name in test genome")
}

#[allow(dead_code)]
pub fn run_updates(world: &mut World, updates: u64) {
    for _ in 0..updates {
        world.update().expect("update failed");
    }
}
