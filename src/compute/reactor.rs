//! Reactor grid: component placements, per-run cell state and hull.

use crate::schema::{BASE_HULL_HEAT, ReactorConfig, ReactorSettings};

use super::component::{CellState, Hull, Placement, ReactorComponent, Site, Tuning};

/// A rows x cols grid of optional components plus hull state.
#[derive(Debug, Clone)]
pub struct Reactor {
    rows: usize,
    cols: usize,
    slots: Vec<Option<Placement>>,
    cells: Vec<CellState>,
    neighbors: Vec<Vec<usize>>,
    hull: Hull,
    settings: ReactorSettings,
}

impl Reactor {
    /// Empty grid with default settings.
    pub fn new(rows: usize, cols: usize) -> Self {
        let size = rows * cols;
        Self {
            rows,
            cols,
            slots: vec![None; size],
            cells: vec![CellState::default(); size],
            neighbors: vec![Vec::new(); size],
            hull: Hull {
                max_heat: BASE_HULL_HEAT,
                ..Default::default()
            },
            settings: ReactorSettings::default(),
        }
    }

    /// Empty grid sized and configured from `config`.
    pub fn from_config(config: &ReactorConfig) -> Self {
        let mut reactor = Self::new(config.rows, config.cols);
        reactor.settings = config.settings.clone();
        reactor
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.slots.len()
    }

    /// Row-major index of a position.
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Position of a row-major index.
    #[inline]
    pub fn position(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }

    pub fn settings(&self) -> &ReactorSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ReactorSettings {
        &mut self.settings
    }

    pub fn hull(&self) -> &Hull {
        &self.hull
    }

    pub fn hull_mut(&mut self) -> &mut Hull {
        &mut self.hull
    }

    /// Put a component at a position with default tuning.
    ///
    /// # Panics
    ///
    /// Panics if the position is outside the grid.
    pub fn place(
        &mut self,
        row: usize,
        col: usize,
        component: Box<dyn ReactorComponent>,
    ) -> Option<Placement> {
        self.set(row, col, Some(Placement::new(component)))
    }

    /// Replace the slot at a position, returning its previous content.
    ///
    /// # Panics
    ///
    /// Panics if the position is outside the grid.
    pub fn set(&mut self, row: usize, col: usize, placement: Option<Placement>) -> Option<Placement> {
        assert!(row < self.rows && col < self.cols, "({row}, {col}) is outside the grid");
        let index = self.index(row, col);
        std::mem::replace(&mut self.slots[index], placement)
    }

    pub fn remove(&mut self, row: usize, col: usize) -> Option<Placement> {
        self.set(row, col, None)
    }

    pub fn placement(&self, index: usize) -> Option<&Placement> {
        self.slots.get(index).and_then(|slot| slot.as_ref())
    }

    pub fn component(&self, index: usize) -> Option<&dyn ReactorComponent> {
        self.placement(index).map(|p| p.component.as_ref())
    }

    pub fn component_at(&self, row: usize, col: usize) -> Option<&dyn ReactorComponent> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.component(self.index(row, col))
    }

    pub fn tuning_mut(&mut self, row: usize, col: usize) -> Option<&mut Tuning> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let index = self.index(row, col);
        self.slots[index].as_mut().map(|p| &mut p.tuning)
    }

    /// Per-run state of a cell (valid after a simulation has started).
    pub fn state(&self, index: usize) -> Option<&CellState> {
        self.cells.get(index)
    }

    pub fn state_mut(&mut self, index: usize) -> Option<&mut CellState> {
        self.cells.get_mut(index)
    }

    /// Row-major indices of occupied cells.
    pub fn occupied(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|_| i))
            .collect()
    }

    /// Whether the component at `index` is currently broken.
    pub fn is_broken(&self, index: usize) -> bool {
        match (self.component(index), self.cells.get(index)) {
            (Some(component), Some(state)) => component.is_broken(state),
            _ => false,
        }
    }

    /// Hull capacity including plating bonuses.
    pub fn max_heat(&self) -> f64 {
        BASE_HULL_HEAT
            + self
                .slots
                .iter()
                .flatten()
                .map(|p| p.component.hull_heat_bonus())
                .sum::<f64>()
    }

    /// Reset hull and cell state for a new run and cache neighbor lists.
    ///
    /// Returns the occupied cells in row-major order.
    pub(crate) fn prepare_run(&mut self) -> Vec<usize> {
        self.hull = Hull {
            heat: self.settings.starting_heat,
            max_heat: self.max_heat(),
            eu_output: 0.0,
            vented_heat: 0.0,
        };

        for (index, slot) in self.slots.iter().enumerate() {
            self.cells[index] = match slot {
                Some(placement) => CellState::new(placement.tuning.initial_heat),
                None => CellState::default(),
            };
        }

        let occupied = self.occupied();
        for index in 0..self.slots.len() {
            let neighbors = if self.slots[index].is_some() {
                self.occupied_neighbors(index)
            } else {
                Vec::new()
            };
            self.neighbors[index] = neighbors;
        }
        occupied
    }

    fn occupied_neighbors(&self, index: usize) -> Vec<usize> {
        let (row, col) = self.position(index);
        let mut neighbors = Vec::with_capacity(4);
        if row > 0 {
            neighbors.push(self.index(row - 1, col));
        }
        if row + 1 < self.rows {
            neighbors.push(self.index(row + 1, col));
        }
        if col > 0 {
            neighbors.push(self.index(row, col - 1));
        }
        if col + 1 < self.cols {
            neighbors.push(self.index(row, col + 1));
        }
        neighbors.retain(|&n| self.slots[n].is_some());
        neighbors
    }

    /// Run `f` with the component at `index` and a [`Site`] around it.
    ///
    /// Returns `None` when the cell is empty.
    pub(crate) fn with_site<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&dyn ReactorComponent, &mut Site<'_>) -> R,
    ) -> Option<R> {
        let Reactor {
            slots,
            cells,
            neighbors,
            hull,
            settings,
            ..
        } = self;
        let component = slots.get(index)?.as_ref()?.component.as_ref();
        let mut site = Site {
            index,
            slots: slots.as_slice(),
            cells: cells.as_mut_slice(),
            neighbors: neighbors[index].as_slice(),
            hull,
            settings,
        };
        Some(f(component, &mut site))
    }
}
