use crate::error::{LatticeError, LatticeResult};
use crate::organism::Organism;
use tessera_data::{CellData, CellId, MutationRates, OrgId};

/// One lattice position.
///
/// Neighbors are referenced by id only; the lattice resolves them. The
/// first connection is the faced neighbor.
#[derive(Debug, Clone)]
pub struct Cell {
    id: CellId,
    x: i32,
    y: i32,
    connections: Vec<CellId>,
    organism: Option<Organism>,
    mut_rates: MutationRates,
    data: CellData,
    spec_state: u32,
}

impl Cell {
    #[must_use]
    pub fn new(id: CellId, x: i32, y: i32, connections: Vec<CellId>, mut_rates: MutationRates) -> Self {
        Self {
            id,
            x,
            y,
            connections,
            organism: None,
            mut_rates,
            data: CellData::default(),
            spec_state: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> CellId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    #[must_use]
    pub fn connections(&self) -> &[CellId] {
        &self.connections
    }

    #[must_use]
    pub fn faced(&self) -> Option<CellId> {
        self.connections.first().copied()
    }

    /// Rotates the connection list until `target` is first.
    pub fn rotate_to(&mut self, target: CellId) -> LatticeResult<()> {
        let index = self
            .connections
            .iter()
            .position(|&c| c == target)
            .ok_or(LatticeError::InvalidNeighbor {
                cell: self.id,
                target,
            })?;
        self.connections.rotate_left(index);
        Ok(())
    }

    /// Turns by `steps` connections; positive is clockwise.
    pub fn rotate_by(&mut self, steps: i32) -> bool {
        let n = self.connections.len();
        if n == 0 {
            return false;
        }
        let shift = i64::from(steps).rem_euclid(n as i64) as usize;
        self.connections.rotate_left(shift);
        true
    }

    #[inline]
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.organism.is_some()
    }

    #[must_use]
    pub fn organism(&self) -> Option<&Organism> {
        self.organism.as_ref()
    }

    pub fn organism_mut(&mut self) -> Option<&mut Organism> {
        self.organism.as_mut()
    }

    /// Moves an organism in. Returns the speculative state that was pending
    /// on the cell, which the caller folds into its waste total.
    pub(crate) fn insert(&mut self, organism: Organism) -> LatticeResult<u32> {
        if self.organism.is_some() {
            return Err(LatticeError::CellOccupied(self.id));
        }
        self.organism = Some(organism);
        Ok(std::mem::take(&mut self.spec_state))
    }

    pub(crate) fn remove(&mut self) -> Option<Organism> {
        self.organism.take()
    }

    /// Puts an organism back after it ran detached; no bookkeeping.
    pub(crate) fn restore(&mut self, organism: Organism) {
        self.organism = Some(organism);
    }

    #[must_use]
    pub fn mut_rates(&self) -> MutationRates {
        self.mut_rates
    }

    pub fn set_mut_rates(&mut self, rates: MutationRates) {
        self.mut_rates = rates;
    }

    #[must_use]
    pub fn data(&self) -> CellData {
        self.data
    }

    /// Records a write to the cell payload.
    pub fn set_data(&mut self, contents: i32, writer: Option<OrgId>, update: u64) {
        self.data.contents = contents;
        self.data.org_id = writer;
        self.data.update = Some(update);
    }

    pub fn set_territory(&mut self, territory: Option<i32>) {
        self.data.territory = territory;
    }

    #[must_use]
    pub fn spec_state(&self) -> u32 {
        self.spec_state
    }

    /// Accumulates steps the resident ran ahead of confirmation.
    pub fn add_spec_state(&mut self, amount: u32) {
        self.spec_state = self.spec_state.saturating_add(amount);
    }

    pub(crate) fn clear_spec_state(&mut self) {
        self.spec_state = 0;
    }

    pub(crate) fn restore_state(&mut self, data: CellData, spec_state: u32) {
        self.data = data;
        self.spec_state = spec_state;
    }
}
