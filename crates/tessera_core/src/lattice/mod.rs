//! The population lattice: a fixed grid of cells, each holding at most one
//! organism, wired to its neighbors at construction.

pub mod cell;
pub mod facing;

pub use cell::Cell;
pub use facing::{faced_dir, facing_code, NEIGHBOR_OFFSETS};

use crate::config::{BirthMethod, Geometry, WorldConfig};
use crate::context::{ExecContext, Externals, OrganismInterface};
use crate::error::{LatticeError, LatticeResult};
use crate::hardware::{HardwareEvent, HardwareSetup};
use crate::organism::Organism;
use rand::{Rng, RngCore};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tessera_data::{
    CellData, CellId, CellSnapshot, Genome, GenotypeId, LatticeSnapshot, MutationRates, OrgId,
};

/// What one cell produced during [`Lattice::process_cell`].
#[derive(Debug, Clone, PartialEq)]
pub struct CellOutcome {
    pub cell: CellId,
    pub position: (i32, i32),
    pub executed: u64,
    pub events: Vec<HardwareEvent>,
}

/// Where an offspring landed and whom it displaced.
#[derive(Debug)]
pub struct Placement {
    pub target: CellId,
    pub evicted: Option<Organism>,
}

/// Read-only population summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Census {
    pub occupied: usize,
    pub parasitized: usize,
    pub abundance: HashMap<GenotypeId, usize>,
}

impl Census {
    /// Genotype with the most organisms; ties go to the smaller id.
    #[must_use]
    pub fn dominant(&self) -> Option<(GenotypeId, usize)> {
        self.abundance
            .iter()
            .map(|(&g, &n)| (g, n))
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
    }
}

#[derive(Debug, Clone)]
pub struct Lattice {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    speculative_waste: u64,
}

impl Lattice {
    /// Builds a `width` x `height` lattice. Connections run clockwise from
    /// north; self-links (on one-wide tori) are dropped.
    pub fn new(
        width: i32,
        height: i32,
        geometry: Geometry,
        rates: MutationRates,
    ) -> LatticeResult<Self> {
        let area = match width.checked_mul(height) {
            Some(area) if width > 0 && height > 0 && area >= 2 => area,
            _ => return Err(LatticeError::InvalidDimensions { width, height }),
        };
        let mut cells = Vec::with_capacity(area as usize);
        for y in 0..height {
            for x in 0..width {
                let id = CellId((y * width + x) as usize);
                let connections = NEIGHBOR_OFFSETS
                    .iter()
                    .filter_map(|&(dx, dy)| {
                        let (nx, ny) = match geometry {
                            Geometry::Torus => {
                                ((x + dx).rem_euclid(width), (y + dy).rem_euclid(height))
                            }
                            Geometry::Grid => {
                                let (nx, ny) = (x + dx, y + dy);
                                if nx < 0 || ny < 0 || nx >= width || ny >= height {
                                    return None;
                                }
                                (nx, ny)
                            }
                        };
                        let neighbor = CellId((ny * width + nx) as usize);
                        (neighbor != id).then_some(neighbor)
                    })
                    .collect();
                cells.push(Cell::new(id, x, y, connections, rates));
            }
        }
        Ok(Self {
            width,
            height,
            cells,
            speculative_waste: 0,
        })
    }

    pub fn from_config(config: &WorldConfig, rates: MutationRates) -> LatticeResult<Self> {
        Self::new(config.width, config.height, config.geometry, rates)
    }

    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, id: CellId) -> LatticeResult<&Cell> {
        self.cells.get(id.0).ok_or(LatticeError::InvalidCell(id))
    }

    pub fn cell_mut(&mut self, id: CellId) -> LatticeResult<&mut Cell> {
        self.cells.get_mut(id.0).ok_or(LatticeError::InvalidCell(id))
    }

    #[must_use]
    pub fn cell_at(&self, x: i32, y: i32) -> Option<CellId> {
        (x >= 0 && y >= 0 && x < self.width && y < self.height)
            .then(|| CellId((y * self.width + x) as usize))
    }

    #[must_use]
    pub fn speculative_waste(&self) -> u64 {
        self.speculative_waste
    }

    // ---- Facing ----

    /// 3-bit code of the direction `id` faces.
    pub fn facing(&self, id: CellId) -> LatticeResult<i32> {
        let cell = self.cell(id)?;
        let faced = cell.faced().ok_or(LatticeError::NoNeighbors(id))?;
        let to = self.cell(faced)?.position();
        Ok(facing_code(cell.position(), to).unwrap_or(facing::FACING_N))
    }

    /// Clockwise direction index (0 = north) `id` faces.
    pub fn faced_dir(&self, id: CellId) -> LatticeResult<i32> {
        self.facing(id).map(faced_dir)
    }

    pub fn rotate_to(&mut self, id: CellId, target: CellId) -> LatticeResult<()> {
        self.cell_mut(id)?.rotate_to(target)
    }

    // ---- Neighborhoods ----

    /// Every cell within `depth` hops of `id`, excluding `id` itself.
    pub fn neighboring_cells(&self, id: CellId, depth: usize) -> LatticeResult<BTreeSet<CellId>> {
        self.cell(id)?;
        let mut seen = BTreeSet::new();
        let mut frontier = vec![id];
        for _ in 0..depth {
            let mut next = Vec::new();
            for current in frontier {
                for &n in self.cells[current.0].connections() {
                    if n != id && seen.insert(n) {
                        next.push(n);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        Ok(seen)
    }

    pub fn occupied_neighboring_cells(
        &self,
        id: CellId,
        depth: usize,
    ) -> LatticeResult<BTreeSet<CellId>> {
        Ok(self
            .neighboring_cells(id, depth)?
            .into_iter()
            .filter(|&c| self.cells[c.0].is_occupied())
            .collect())
    }

    /// Occupied direct neighbors in connection order.
    pub fn occupied_adjacent(&self, id: CellId) -> LatticeResult<Vec<CellId>> {
        Ok(self
            .cell(id)?
            .connections()
            .iter()
            .copied()
            .filter(|&c| self.cells[c.0].is_occupied())
            .collect())
    }

    // ---- Occupancy ----

    /// Moves `organism` into an empty cell.
    ///
    /// An occupied cell is left untouched and the newcomer is dropped. Any
    /// speculative state pending on the cell is added to the waste total:
    /// those are steps a displaced resident ran in an update it did not
    /// survive.
    pub fn insert_organism(&mut self, id: CellId, organism: Organism) -> LatticeResult<()> {
        let pending = self.cell_mut(id)?.insert(organism)?;
        self.speculative_waste += u64::from(pending);
        Ok(())
    }

    /// Confirms the steps run so far; pending speculative state no longer
    /// counts as waste. Called once the driver finishes an update.
    pub fn confirm_speculation(&mut self) {
        for cell in &mut self.cells {
            cell.clear_spec_state();
        }
    }

    pub fn remove_organism(&mut self, id: CellId) -> Option<Organism> {
        self.cells.get_mut(id.0).and_then(Cell::remove)
    }

    fn choose_birth_cell(
        &self,
        parent: CellId,
        method: BirthMethod,
        rng: &mut dyn RngCore,
    ) -> LatticeResult<CellId> {
        let connections = self.cell(parent)?.connections();
        if connections.is_empty() {
            return Err(LatticeError::NoNeighbors(parent));
        }
        let target = match method {
            BirthMethod::FacedCell => connections[0],
            BirthMethod::RandomNeighbor => connections[rng.gen_range(0..connections.len())],
            BirthMethod::PreferEmpty => {
                let empty: Vec<CellId> = connections
                    .iter()
                    .copied()
                    .filter(|&c| !self.cells[c.0].is_occupied())
                    .collect();
                if empty.is_empty() {
                    connections[rng.gen_range(0..connections.len())]
                } else {
                    empty[rng.gen_range(0..empty.len())]
                }
            }
        };
        Ok(target)
    }

    /// Places an offspring next to `parent`, evicting any resident of the
    /// chosen cell.
    pub fn place_offspring(
        &mut self,
        parent: CellId,
        child: Organism,
        method: BirthMethod,
        rng: &mut dyn RngCore,
    ) -> LatticeResult<Placement> {
        let target = self.choose_birth_cell(parent, method, rng)?;
        let evicted = self.remove_organism(target);
        if let Some(old) = &evicted {
            tracing::trace!(cell = %target, evicted = %old.id, "offspring replaced resident");
        }
        self.insert_organism(target, child)?;
        Ok(Placement { target, evicted })
    }

    /// Hands injected code to whatever lives in the cell `from` faces.
    /// Returns whether a host took it.
    pub fn deliver_injection(
        &mut self,
        from: CellId,
        code: &Genome,
        owner: GenotypeId,
    ) -> LatticeResult<bool> {
        let target = self
            .cell(from)?
            .faced()
            .ok_or(LatticeError::NoNeighbors(from))?;
        let Some(host) = self.cell_mut(target)?.organism_mut() else {
            return Ok(false);
        };
        match host.cpu_mut().inject_host(code, owner) {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::trace!(cell = %target, error = %e, "injection refused");
                Ok(false)
            }
        }
    }

    // ---- Execution ----

    /// Runs the organism in `id` for one update slice.
    ///
    /// The organism is lifted out of its cell while it runs and sees the
    /// lattice only through an [`OrganismInterface`].
    pub fn process_cell(
        &mut self,
        id: CellId,
        ext: &mut Externals<'_>,
    ) -> LatticeResult<CellOutcome> {
        let position = self.cell(id)?.position();
        let mut organism = self
            .cell_mut(id)?
            .remove()
            .ok_or(LatticeError::CellEmpty(id))?;
        let org_id = organism.id;
        let executed = {
            let mut interface = CellInterface {
                lattice: self,
                cell: id,
                org_id,
            };
            let mut ctx = ExecContext::new(ext, &mut interface);
            organism.process(&mut ctx)
        };
        let events = organism.take_events();
        let cell = &mut self.cells[id.0];
        cell.restore(organism);
        cell.add_spec_state(u32::try_from(executed).unwrap_or(u32::MAX));
        Ok(CellOutcome {
            cell: id,
            position,
            executed,
            events,
        })
    }

    // ---- Summaries ----

    #[must_use]
    pub fn census(&self) -> Census {
        #[cfg(feature = "parallel")]
        let residents: Vec<(GenotypeId, bool)> = self
            .cells
            .par_iter()
            .filter_map(|c| c.organism().map(|o| (o.genotype, o.is_parasitized())))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let residents: Vec<(GenotypeId, bool)> = self
            .cells
            .iter()
            .filter_map(|c| c.organism().map(|o| (o.genotype, o.is_parasitized())))
            .collect();

        let mut census = Census {
            occupied: residents.len(),
            ..Census::default()
        };
        for (genotype, parasitized) in residents {
            *census.abundance.entry(genotype).or_default() += 1;
            if parasitized {
                census.parasitized += 1;
            }
        }
        census
    }

    #[must_use]
    pub fn snapshot(&self) -> LatticeSnapshot {
        LatticeSnapshot {
            width: self.width,
            height: self.height,
            cells: self
                .cells
                .iter()
                .map(|c| {
                    let (x, y) = c.position();
                    CellSnapshot {
                        id: c.id(),
                        x,
                        y,
                        connections: c.connections().to_vec(),
                        mut_rates: c.mut_rates(),
                        data: c.data(),
                        spec_state: c.spec_state(),
                        organism: c.organism().map(Organism::snapshot),
                    }
                })
                .collect(),
            speculative_waste: self.speculative_waste,
        }
    }

    /// Rebuilds a lattice, connections included, from a snapshot.
    pub fn from_snapshot(
        setup: &Arc<HardwareSetup>,
        snapshot: &LatticeSnapshot,
    ) -> LatticeResult<Self> {
        let (width, height) = (snapshot.width, snapshot.height);
        let area = width.checked_mul(height).filter(|_| width > 0 && height > 0);
        if area.map_or(true, |a| snapshot.cells.len() != a as usize) {
            return Err(LatticeError::InvalidDimensions { width, height });
        }
        let mut cells = Vec::with_capacity(snapshot.cells.len());
        for (index, saved) in snapshot.cells.iter().enumerate() {
            if saved.id.0 != index
                || saved.connections.iter().any(|c| c.0 >= snapshot.cells.len() || *c == saved.id)
            {
                return Err(LatticeError::InvalidCell(saved.id));
            }
            let mut cell = Cell::new(
                saved.id,
                saved.x,
                saved.y,
                saved.connections.clone(),
                saved.mut_rates,
            );
            cell.restore_state(saved.data, saved.spec_state);
            if let Some(org) = &saved.organism {
                cell.restore(Organism::from_snapshot(Arc::clone(setup), org)?);
            }
            cells.push(cell);
        }
        Ok(Self {
            width,
            height,
            cells,
            speculative_waste: snapshot.speculative_waste,
        })
    }
}

/// A running organism's view of its cell.
struct CellInterface<'a> {
    lattice: &'a mut Lattice,
    cell: CellId,
    org_id: OrgId,
}

impl OrganismInterface for CellInterface<'_> {
    fn cell_id(&self) -> Option<CellId> {
        Some(self.cell)
    }

    fn facing(&self) -> i32 {
        self.lattice.facing(self.cell).unwrap_or(facing::FACING_N)
    }

    fn faced_dir(&self) -> i32 {
        self.lattice.faced_dir(self.cell).unwrap_or(0)
    }

    fn rotate(&mut self, steps: i32) -> bool {
        self.lattice.cells[self.cell.0].rotate_by(steps)
    }

    fn occupied_neighbors(&self) -> usize {
        self.lattice
            .occupied_adjacent(self.cell)
            .map_or(0, |cells| cells.len())
    }

    fn mut_rates(&self) -> MutationRates {
        self.lattice.cells[self.cell.0].mut_rates()
    }

    fn cell_data(&self) -> CellData {
        self.lattice.cells[self.cell.0].data()
    }

    fn set_cell_data(&mut self, contents: i32, update: u64) {
        self.lattice.cells[self.cell.0].set_data(contents, Some(self.org_id), update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{NullFeedback, RandomInputs};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn torus(w: i32, h: i32) -> Lattice {
        Lattice::new(w, h, Geometry::Torus, MutationRates::zero()).unwrap()
    }

    fn organism(id: u64, genotype: u128, ops: &[u8]) -> Organism {
        Organism::new(
            OrgId(id),
            GenotypeId::from_u128(genotype),
            0,
            HardwareSetup::standard(),
            Genome::from_ops(ops),
        )
    }

    #[test]
    fn test_torus_connections_clockwise_from_north() {
        let lattice = torus(3, 3);
        let center = lattice.cell_at(1, 1).unwrap();
        let positions: Vec<(i32, i32)> = lattice
            .cell(center)
            .unwrap()
            .connections()
            .iter()
            .map(|&c| lattice.cell(c).unwrap().position())
            .collect();
        assert_eq!(
            positions,
            vec![(1, 0), (2, 0), (2, 1), (2, 2), (1, 2), (0, 2), (0, 1), (0, 0)]
        );
    }

    #[test]
    fn test_grid_corners_have_three_neighbors() {
        let lattice = Lattice::new(4, 3, Geometry::Grid, MutationRates::zero()).unwrap();
        assert_eq!(lattice.cell(CellId(0)).unwrap().connections().len(), 3);
        assert_eq!(lattice.cell_at(1, 1).map(|c| lattice.cell(c).unwrap().connections().len()), Some(8));
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        for geometry in [Geometry::Torus, Geometry::Grid] {
            let lattice = Lattice::new(5, 4, geometry, MutationRates::zero()).unwrap();
            for cell in lattice.cells() {
                for &n in cell.connections() {
                    assert!(lattice.cell(n).unwrap().connections().contains(&cell.id()));
                }
            }
        }
    }

    #[test]
    fn test_one_wide_torus_drops_self_links() {
        let lattice = torus(1, 4);
        for cell in lattice.cells() {
            assert!(!cell.connections().contains(&cell.id()));
        }
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(matches!(
            Lattice::new(0, 3, Geometry::Torus, MutationRates::zero()),
            Err(LatticeError::InvalidDimensions { .. })
        ));
        assert!(Lattice::new(1, 1, Geometry::Grid, MutationRates::zero()).is_err());
        assert_eq!(
            Lattice::new(i32::MAX, 2, Geometry::Torus, MutationRates::zero()).unwrap_err(),
            LatticeError::InvalidDimensions {
                width: i32::MAX,
                height: 2
            }
        );
        let oversized = LatticeSnapshot {
            width: 65_536,
            height: 65_536,
            cells: Vec::new(),
            speculative_waste: 0,
        };
        assert!(matches!(
            Lattice::from_snapshot(&HardwareSetup::standard(), &oversized),
            Err(LatticeError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_facing_after_rotation() {
        let mut lattice = torus(3, 3);
        let center = lattice.cell_at(1, 1).unwrap();
        assert_eq!(lattice.facing(center).unwrap(), facing::FACING_N);
        let east = lattice.cell_at(2, 1).unwrap();
        lattice.rotate_to(center, east).unwrap();
        assert_eq!(lattice.facing(center).unwrap(), facing::FACING_E);
        assert_eq!(lattice.faced_dir(center).unwrap(), 2);
    }

    #[test]
    fn test_neighbors_depth_two_covers_five_by_five() {
        let lattice = torus(7, 7);
        let center = lattice.cell_at(3, 3).unwrap();
        assert_eq!(lattice.neighboring_cells(center, 1).unwrap().len(), 8);
        let ring = lattice.neighboring_cells(center, 2).unwrap();
        assert_eq!(ring.len(), 24);
        assert!(!ring.contains(&center));
        assert!(lattice.neighboring_cells(center, 0).unwrap().is_empty());
    }

    #[test]
    fn test_insert_into_occupied_rejected() {
        let mut lattice = torus(3, 3);
        lattice.insert_organism(CellId(4), organism(1, 1, &[0])).unwrap();
        let err = lattice
            .insert_organism(CellId(4), organism(2, 2, &[1]))
            .unwrap_err();
        assert_eq!(err, LatticeError::CellOccupied(CellId(4)));
        assert_eq!(lattice.cell(CellId(4)).unwrap().organism().unwrap().id, OrgId(1));
        assert!(lattice.remove_organism(CellId(4)).is_some());
        assert!(lattice.remove_organism(CellId(4)).is_none());
    }

    #[test]
    fn test_insert_folds_speculative_state() {
        let mut lattice = torus(3, 3);
        lattice.cell_mut(CellId(2)).unwrap().add_spec_state(6);
        lattice.insert_organism(CellId(2), organism(1, 1, &[0])).unwrap();
        assert_eq!(lattice.speculative_waste(), 6);
        assert_eq!(lattice.cell(CellId(2)).unwrap().spec_state(), 0);
    }

    #[test]
    fn test_prefer_empty_avoids_residents() {
        let mut lattice = torus(3, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let center = CellId(4);
        let neighbors: Vec<CellId> = lattice.cell(center).unwrap().connections().to_vec();
        for (i, &n) in neighbors.iter().enumerate().skip(1) {
            lattice.insert_organism(n, organism(i as u64, 1, &[0])).unwrap();
        }
        let placement = lattice
            .place_offspring(center, organism(99, 2, &[0]), BirthMethod::PreferEmpty, &mut rng)
            .unwrap();
        assert_eq!(placement.target, neighbors[0]);
        assert!(placement.evicted.is_none());
    }

    #[test]
    fn test_faced_birth_evicts_resident() {
        let mut lattice = torus(3, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let faced = lattice.cell(CellId(4)).unwrap().faced().unwrap();
        lattice.insert_organism(faced, organism(1, 1, &[0])).unwrap();
        let placement = lattice
            .place_offspring(CellId(4), organism(2, 2, &[0]), BirthMethod::FacedCell, &mut rng)
            .unwrap();
        assert_eq!(placement.evicted.map(|o| o.id), Some(OrgId(1)));
        assert_eq!(lattice.cell(faced).unwrap().organism().unwrap().id, OrgId(2));
    }

    #[test]
    fn test_occupied_subset_of_neighbors() {
        let mut lattice = torus(5, 5);
        for id in [0, 3, 7, 12, 18] {
            lattice.insert_organism(CellId(id), organism(id as u64, 1, &[0])).unwrap();
        }
        for depth in 1..4 {
            let all = lattice.neighboring_cells(CellId(12), depth).unwrap();
            let occupied = lattice.occupied_neighboring_cells(CellId(12), depth).unwrap();
            assert!(occupied.is_subset(&all));
            assert!(!occupied.contains(&CellId(12)));
        }
        assert_eq!(lattice.occupied_adjacent(CellId(12)).unwrap(), vec![CellId(7), CellId(18)]);
    }

    #[test]
    fn test_process_cell_runs_and_restores() {
        let mut lattice = torus(3, 3);
        // sense-neighbors, set-cell-data, rotate-r
        lattice.insert_organism(CellId(4), organism(1, 1, &[41, 43, 39])).unwrap();
        lattice.insert_organism(CellId(1), organism(2, 1, &[0])).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut inputs = RandomInputs;
        let mut feedback = NullFeedback;
        let mut ext = Externals {
            rng: &mut rng,
            inputs: &mut inputs,
            feedback: &mut feedback,
            update: 3,
        };
        for _ in 0..3 {
            let outcome = lattice.process_cell(CellId(4), &mut ext).unwrap();
            assert_eq!(outcome.position, (1, 1));
        }
        let cell = lattice.cell(CellId(4)).unwrap();
        assert!(cell.is_occupied());
        assert_eq!(cell.data().contents, 1);
        assert_eq!(cell.data().org_id, Some(OrgId(1)));
        assert_eq!(lattice.faced_dir(CellId(4)).unwrap(), 1);
        assert!(matches!(
            lattice.process_cell(CellId(0), &mut ext),
            Err(LatticeError::CellEmpty(_))
        ));
    }

    #[test]
    fn test_injection_reaches_faced_host() {
        let mut lattice = torus(3, 3);
        let faced = lattice.cell(CellId(4)).unwrap().faced().unwrap();
        let code = Genome::from_ops(&[12, 12]);
        assert!(!lattice.deliver_injection(CellId(4), &code, GenotypeId::nil()).unwrap());
        lattice.insert_organism(faced, organism(1, 1, &[0])).unwrap();
        assert!(lattice.deliver_injection(CellId(4), &code, GenotypeId::nil()).unwrap());
        assert_eq!(lattice.census().parasitized, 1);
    }

    #[test]
    fn test_census_counts_genotypes() {
        let mut lattice = torus(3, 3);
        lattice.insert_organism(CellId(0), organism(1, 7, &[0])).unwrap();
        lattice.insert_organism(CellId(1), organism(2, 7, &[0])).unwrap();
        lattice.insert_organism(CellId(2), organism(3, 8, &[0])).unwrap();
        let census = lattice.census();
        assert_eq!(census.occupied, 3);
        assert_eq!(census.dominant(), Some((GenotypeId::from_u128(7), 2)));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut lattice = torus(3, 2);
        lattice.cell_mut(CellId(5)).unwrap().add_spec_state(4);
        lattice.insert_organism(CellId(5), organism(1, 7, &[0, 12])).unwrap();
        lattice.cell_mut(CellId(5)).unwrap().rotate_by(3);
        lattice.cell_mut(CellId(0)).unwrap().set_data(9, None, 2);
        let snapshot = lattice.snapshot();
        let restored = Lattice::from_snapshot(&HardwareSetup::standard(), &snapshot).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.speculative_waste(), 4);
    }

    #[test]
    fn test_evicted_resident_steps_become_waste() {
        let mut lattice = torus(3, 3);
        let faced = lattice.cell(CellId(4)).unwrap().faced().unwrap();
        lattice.insert_organism(faced, organism(1, 1, &[12, 12])).unwrap();
        lattice.insert_organism(CellId(0), organism(2, 1, &[12, 12])).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let (mut inputs, mut feedback) = (RandomInputs, NullFeedback);
        {
            let mut ext = Externals {
                rng: &mut rng,
                inputs: &mut inputs,
                feedback: &mut feedback,
                update: 0,
            };
            assert_eq!(lattice.process_cell(faced, &mut ext).unwrap().executed, 1);
            lattice.process_cell(CellId(0), &mut ext).unwrap();
        }
        assert_eq!(lattice.cell(faced).unwrap().spec_state(), 1);

        lattice
            .place_offspring(CellId(4), organism(3, 2, &[0]), BirthMethod::FacedCell, &mut rng)
            .unwrap();
        assert_eq!(lattice.speculative_waste(), 1);

        // the survivor's step is confirmed, not wasted
        lattice.confirm_speculation();
        assert_eq!(lattice.cell(CellId(0)).unwrap().spec_state(), 0);
        let resident = lattice.remove_organism(CellId(0)).unwrap();
        lattice.insert_organism(CellId(0), resident).unwrap();
        assert_eq!(lattice.speculative_waste(), 1);
    }
}
