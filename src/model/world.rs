use crate::model::genotypes::GenotypeRegistry;
use anyhow::Context;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Instant;
use tessera_core::config::AppConfig;
use tessera_core::context::{Externals, OutputLog, RandomInputs};
use tessera_core::hardware::{HardwareEvent, HardwareSetup};
use tessera_core::lattice::{CellOutcome, Lattice};
use tessera_core::{Census, Metrics, Organism};
use tessera_data::{CellId, Genome, GenotypeId, LatticeSnapshot, OrgId};

/// What happened during one call to [`World::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub update: u64,
    pub executed: u64,
    pub births: usize,
    pub evictions: usize,
    pub divide_failures: usize,
    pub injections: usize,
}

/// Reference driver: owns a lattice and everything an organism needs from
/// outside, and advances it one update at a time.
///
/// Each update visits the occupied cells in a shuffled order and gives
/// every organism one time slice. Births replace whatever lives in the
/// target cell.
pub struct World {
    pub config: AppConfig,
    setup: Arc<HardwareSetup>,
    pub lattice: Lattice,
    pub registry: GenotypeRegistry,
    pub metrics: Metrics,
    pub outputs: OutputLog,
    rng: ChaCha8Rng,
    inputs: RandomInputs,
    update: u64,
    next_org_id: u64,
    waste_reported: u64,
}

impl World {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let setup = HardwareSetup::from_config(&config)?;
        let lattice = Lattice::from_config(&config.world, config.mutation.rates())?;
        let rng = match config.world.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        tracing::debug!(
            width = config.world.width,
            height = config.world.height,
            fingerprint = %config.fingerprint(),
            "world created"
        );
        Ok(Self {
            config,
            setup,
            lattice,
            registry: GenotypeRegistry::new(),
            metrics: Metrics::new(),
            outputs: OutputLog::default(),
            rng,
            inputs: RandomInputs,
            update: 0,
            next_org_id: 0,
            waste_reported: 0,
        })
    }

    #[must_use]
    pub fn setup(&self) -> &Arc<HardwareSetup> {
        &self.setup
    }

    #[must_use]
    pub fn update_count(&self) -> u64 {
        self.update
    }

    #[must_use]
    pub fn census(&self) -> Census {
        self.lattice.census()
    }

    fn spawn(
        &mut self,
        genome: Genome,
        parent: Option<GenotypeId>,
        generation: u32,
    ) -> Organism {
        let genotype = self
            .registry
            .record_birth(&genome, parent, self.update, &mut self.rng);
        let id = OrgId(self.next_org_id);
        self.next_org_id += 1;
        let mut organism = Organism::new(id, genotype, generation, Arc::clone(&self.setup), genome);
        organism.reset(&mut Externals {
            rng: &mut self.rng,
            inputs: &mut self.inputs,
            feedback: &mut self.outputs,
            update: self.update,
        });
        organism
    }

    /// Places a founding organism in an empty cell.
    pub fn inject(&mut self, cell: CellId, genome: Genome) -> anyhow::Result<OrgId> {
        anyhow::ensure!(
            !self.lattice.cell(cell)?.is_occupied(),
            "{cell} is already occupied"
        );
        let organism = self.spawn(genome, None, 0);
        let id = organism.id;
        self.lattice.insert_organism(cell, organism)?;
        tracing::info!(%cell, org = %id, "organism injected");
        Ok(id)
    }

    /// Injects the default ancestor into the center cell.
    pub fn inject_ancestor(&mut self) -> anyhow::Result<OrgId> {
        let genome = tessera_core::ancestor::default_ancestor(&self.setup.inst_set)?;
        let center = self
            .lattice
            .cell_at(self.lattice.width() / 2, self.lattice.height() / 2)
            .context("lattice has no center cell")?;
        self.inject(center, genome)
    }

    /// Runs one update.
    pub fn update(&mut self) -> anyhow::Result<UpdateReport> {
        let start = Instant::now();
        let mut report = UpdateReport {
            update: self.update,
            ..UpdateReport::default()
        };

        let mut order: Vec<CellId> = self
            .lattice
            .cells()
            .iter()
            .filter(|c| c.is_occupied())
            .map(|c| c.id())
            .collect();
        order.shuffle(&mut self.rng);

        for cell in order {
            // emptied by an earlier resolution
            if !self.lattice.cell(cell)?.is_occupied() {
                continue;
            }
            let outcome = {
                let mut ext = Externals {
                    rng: &mut self.rng,
                    inputs: &mut self.inputs,
                    feedback: &mut self.outputs,
                    update: self.update,
                };
                self.lattice.process_cell(cell, &mut ext)?
            };
            report.executed += outcome.executed;
            self.resolve(outcome, &mut report)?;
        }

        self.lattice.confirm_speculation();
        let waste = self.lattice.speculative_waste();
        self.metrics.add_speculative_waste(waste - self.waste_reported);
        self.waste_reported = waste;
        self.metrics.record_instructions(report.executed);
        self.metrics.record_update(
            start.elapsed(),
            self.census().occupied,
            self.config.world.log_interval,
        );
        self.update += 1;
        Ok(report)
    }

    fn resolve(&mut self, outcome: CellOutcome, report: &mut UpdateReport) -> anyhow::Result<()> {
        let CellOutcome { cell, events, .. } = outcome;
        for event in events {
            match event {
                HardwareEvent::Division { child, .. } => {
                    let Some(parent) = self.lattice.cell(cell)?.organism() else {
                        continue;
                    };
                    let (genotype, generation) = (parent.genotype, parent.generation + 1);
                    let child = self.spawn(child, Some(genotype), generation);
                    let placement = self.lattice.place_offspring(
                        cell,
                        child,
                        self.config.world.birth_method,
                        &mut self.rng,
                    )?;
                    tracing::trace!(parent = %cell, target = %placement.target, "offspring placed");
                    if let Some(evicted) = placement.evicted {
                        self.registry.record_death(evicted.genotype);
                        self.metrics.record_death();
                        report.evictions += 1;
                    }
                    self.metrics.record_birth();
                    report.births += 1;
                }
                HardwareEvent::Injection { code } => {
                    let owner = self
                        .lattice
                        .cell(cell)?
                        .organism()
                        .map_or(GenotypeId::nil(), |o| o.genotype);
                    if self.lattice.deliver_injection(cell, &code, owner)? {
                        self.metrics.increment_counter("injections");
                        report.injections += 1;
                    }
                }
                HardwareEvent::DivideFailed(reason) => {
                    tracing::trace!(%cell, %reason, "divide failed");
                    self.metrics.record_divide_failure();
                    report.divide_failures += 1;
                }
                HardwareEvent::CopyCorrectionExhausted { .. } => {
                    self.metrics.record_correction_exhausted();
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn snapshot(&self) -> LatticeSnapshot {
        self.lattice.snapshot()
    }

    /// Replaces the lattice with one rebuilt from `snapshot` and recounts
    /// the genotype registry from the restored residents.
    pub fn restore(&mut self, snapshot: &LatticeSnapshot) -> anyhow::Result<()> {
        self.lattice = Lattice::from_snapshot(&self.setup, snapshot)?;
        self.next_org_id = self
            .lattice
            .cells()
            .iter()
            .filter_map(|c| c.organism().map(|o| o.id.0 + 1))
            .max()
            .unwrap_or(0)
            .max(self.next_org_id);
        self.registry = GenotypeRegistry::new();
        for organism in self.lattice.cells().iter().filter_map(|c| c.organism()) {
            self.registry
                .record_restored(organism.genome(), organism.genotype, self.update);
        }
        self.waste_reported = self.lattice.speculative_waste();
        Ok(())
    }
}
