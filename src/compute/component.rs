//! Component contract shared by every reactor part.
//!
//! A [`ReactorComponent`] is immutable during a run. All per-run mutable
//! data (heat, damage, per-tick heating and cooling figures) lives in a
//! [`CellState`] owned by the [`Reactor`](super::Reactor), and hooks reach
//! their neighbors and the hull through a [`Site`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::ReactorSettings;

/// Coolant consumed by condensator refills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Coolant {
    Redstone,
    Lapis,
}

/// Per-placement tuning set when a component is put on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    /// Heat the component starts each run with.
    pub initial_heat: f64,
    /// Heat or damage at which an automated reactor replaces the component.
    pub automation_threshold: f64,
    /// Ticks the reactor pauses after replacing this component.
    pub reactor_pause: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            initial_heat: 0.0,
            automation_threshold: 9_000.0,
            reactor_pause: 0,
        }
    }
}

/// Heating and cooling a component took part in during the current tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickFlux {
    pub hull_heating: f64,
    pub component_heating: f64,
    pub hull_cooling: f64,
    pub vent_cooling: f64,
    pub cell_cooling: f64,
    pub condensator_cooling: f64,
}

/// Mutable per-run state of one occupied cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellState {
    pub heat: f64,
    pub damage: f64,
    pub max_reached_heat: f64,
    pub flux: TickFlux,
    pub best_vent_cooling: f64,
    pub best_cell_cooling: f64,
    pub best_condensator_cooling: f64,
    pub min_heat_generated: f64,
    pub max_heat_generated: f64,
    pub min_eu_generated: f64,
    pub max_eu_generated: f64,
    /// Breakage already recorded this run.
    pub break_recorded: bool,
    /// Still holding heat when cooldown started.
    pub needs_cooldown: bool,
    /// Cooldown tick at which this cell reached zero heat.
    pub cooldown_ticks: Option<u32>,
    /// Diagnostic lines collected when logging is enabled.
    pub info: Vec<String>,
}

impl CellState {
    /// Fresh state for the start of a run.
    pub fn new(initial_heat: f64) -> Self {
        Self {
            heat: initial_heat,
            damage: 0.0,
            max_reached_heat: initial_heat,
            flux: TickFlux::default(),
            best_vent_cooling: 0.0,
            best_cell_cooling: 0.0,
            best_condensator_cooling: 0.0,
            min_heat_generated: f64::MAX,
            max_heat_generated: 0.0,
            min_eu_generated: f64::MAX,
            max_eu_generated: 0.0,
            break_recorded: false,
            needs_cooldown: false,
            cooldown_ticks: None,
            info: Vec::new(),
        }
    }

    /// Record heat produced this tick.
    pub fn record_heat_generated(&mut self, heat: f64) {
        self.min_heat_generated = self.min_heat_generated.min(heat);
        self.max_heat_generated = self.max_heat_generated.max(heat);
    }

    /// Record energy produced this tick.
    pub fn record_eu_generated(&mut self, eu: f64) {
        self.min_eu_generated = self.min_eu_generated.min(eu);
        self.max_eu_generated = self.max_eu_generated.max(eu);
    }
}

impl Default for CellState {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Reactor hull: shared heat pool plus this tick's output accumulators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hull {
    pub heat: f64,
    pub max_heat: f64,
    /// EU produced this tick.
    pub eu_output: f64,
    /// Heat vented out of the reactor this tick.
    pub vented_heat: f64,
}

impl Hull {
    /// Add (or with a negative value remove) hull heat, never dropping below zero.
    pub fn adjust_heat(&mut self, heat: f64) {
        self.heat = (self.heat + heat).max(0.0);
    }

    pub fn vent(&mut self, heat: f64) {
        self.vented_heat += heat;
    }

    pub fn add_output(&mut self, eu: f64) {
        self.eu_output += eu;
    }

    /// Hull heat as a fraction of capacity.
    #[inline]
    pub fn heat_fraction(&self) -> f64 {
        if self.max_heat > 0.0 {
            self.heat / self.max_heat
        } else {
            0.0
        }
    }

    pub(crate) fn clear_tick(&mut self) {
        self.eu_output = 0.0;
        self.vented_heat = 0.0;
    }
}

/// A component placed on the grid together with its tuning.
#[derive(Debug, Clone)]
pub struct Placement {
    pub component: Box<dyn ReactorComponent>,
    pub tuning: Tuning,
}

impl Placement {
    pub fn new(component: Box<dyn ReactorComponent>) -> Self {
        Self {
            component,
            tuning: Tuning::default(),
        }
    }

    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }
}

/// View of the grid handed to a component hook.
///
/// Gives mutable access to the hooked cell, its occupied neighbors and the
/// hull while the component itself stays borrowed immutably.
pub struct Site<'a> {
    pub(crate) index: usize,
    pub(crate) slots: &'a [Option<Placement>],
    pub(crate) cells: &'a mut [CellState],
    pub(crate) neighbors: &'a [usize],
    pub(crate) hull: &'a mut Hull,
    pub(crate) settings: &'a ReactorSettings,
}

impl<'a> Site<'a> {
    /// Grid index of the hooked cell.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> &CellState {
        &self.cells[self.index]
    }

    pub fn state_mut(&mut self) -> &mut CellState {
        &mut self.cells[self.index]
    }

    pub fn tuning(&self) -> Tuning {
        self.slots[self.index]
            .as_ref()
            .map(|p| p.tuning)
            .unwrap_or_default()
    }

    pub fn hull(&self) -> &Hull {
        &*self.hull
    }

    pub fn hull_mut(&mut self) -> &mut Hull {
        &mut *self.hull
    }

    pub fn settings(&self) -> &ReactorSettings {
        self.settings
    }

    /// Occupied orthogonal neighbors, in up/down/left/right order.
    pub fn neighbors(&self) -> &'a [usize] {
        self.neighbors
    }

    /// Component at a grid index.
    pub fn component(&self, cell: usize) -> Option<&'a dyn ReactorComponent> {
        self.slots
            .get(cell)
            .and_then(|slot| slot.as_ref())
            .map(|p| p.component.as_ref())
    }

    pub fn state_of(&self, cell: usize) -> &CellState {
        &self.cells[cell]
    }

    pub fn is_heat_acceptor(&self, cell: usize) -> bool {
        self.component(cell)
            .is_some_and(|c| c.is_heat_acceptor(&self.cells[cell]))
    }

    pub fn is_coolable(&self, cell: usize) -> bool {
        self.component(cell).is_some_and(|c| c.is_coolable())
    }

    pub fn is_neutron_reflector(&self, cell: usize) -> bool {
        self.component(cell)
            .is_some_and(|c| c.is_neutron_reflector(&self.cells[cell]))
    }

    pub fn rod_count(&self, cell: usize) -> u32 {
        self.component(cell).map_or(0, |c| c.rod_count())
    }

    /// Adjust the heat of any cell, returning the heat it rejected.
    pub fn adjust_heat_of(&mut self, cell: usize, heat: f64) -> f64 {
        match self.component(cell) {
            Some(component) => component.adjust_heat(&mut self.cells[cell], heat),
            None => heat,
        }
    }

    /// Adjust the hooked cell's own heat, returning the heat it rejected.
    pub fn adjust_own_heat(&mut self, heat: f64) -> f64 {
        self.adjust_heat_of(self.index, heat)
    }

    pub fn apply_own_damage(&mut self, damage: f64) {
        if let Some(component) = self.component(self.index) {
            component.apply_damage(&mut self.cells[self.index], damage);
        }
    }

    /// Occupied neighbors that currently accept heat.
    pub fn heat_acceptors(&self) -> Vec<usize> {
        self.neighbors
            .iter()
            .copied()
            .filter(|&n| self.is_heat_acceptor(n))
            .collect()
    }
}

/// Clone support for boxed components.
pub trait ComponentClone {
    fn clone_boxed(&self) -> Box<dyn ReactorComponent>;
}

impl<T> ComponentClone for T
where
    T: ReactorComponent + Clone + 'static,
{
    fn clone_boxed(&self) -> Box<dyn ReactorComponent> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn ReactorComponent> {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

/// Behavior of one kind of reactor part.
///
/// Default methods implement a passive part: it holds heat up to
/// `max_heat`, breaks on heat or damage, and does nothing on the tick hooks.
pub trait ReactorComponent: ComponentClone + Send + Sync + fmt::Debug {
    /// Factory id.
    fn id(&self) -> i32;

    /// Display name, also used for replacement tallies.
    fn name(&self) -> &str;

    /// Family name (e.g. `"rshCondensator"`).
    fn base_name(&self) -> &str;

    fn max_damage(&self) -> f64 {
        1.0
    }

    fn max_heat(&self) -> f64 {
        1.0
    }

    /// Number of fuel rods this part contains.
    fn rod_count(&self) -> u32 {
        0
    }

    fn is_broken(&self, state: &CellState) -> bool {
        state.heat >= self.max_heat() || state.damage >= self.max_damage()
    }

    fn is_heat_acceptor(&self, state: &CellState) -> bool {
        self.max_heat() > 1.0 && !self.is_broken(state)
    }

    fn is_coolable(&self) -> bool {
        self.max_heat() > 1.0
    }

    fn is_neutron_reflector(&self, _state: &CellState) -> bool {
        false
    }

    /// Add heat (negative to cool), returning what could not be absorbed.
    ///
    /// Overflow past `max_heat` is returned as a positive value; cooling
    /// below zero is returned as a negative value.
    fn adjust_heat(&self, state: &mut CellState, heat: f64) -> f64 {
        absorb_heat(self, state, heat)
    }

    fn apply_damage(&self, state: &mut CellState, damage: f64) {
        if self.max_damage() > 1.0 && damage > 0.0 {
            state.damage += damage;
        }
    }

    fn explosion_power_offset(&self, _state: &CellState) -> f64 {
        0.0
    }

    fn explosion_power_multiplier(&self) -> f64 {
        1.0
    }

    /// Extra hull heat capacity granted while placed.
    fn hull_heat_bonus(&self) -> f64 {
        0.0
    }

    fn vent_cooling_capacity(&self, _site: &Site<'_>) -> f64 {
        0.0
    }

    fn hull_cooling_capacity(&self) -> f64 {
        0.0
    }

    /// Coolant this part consumes when refilled.
    fn coolant(&self) -> Option<Coolant> {
        None
    }

    fn needs_coolant(&self, _state: &CellState) -> bool {
        false
    }

    fn inject_coolant(&self, _state: &mut CellState) {}

    fn pre_tick(&self, _site: &mut Site<'_>) {}

    /// Produce heat; returns the amount generated.
    fn generate_heat(&self, _site: &mut Site<'_>) -> f64 {
        0.0
    }

    /// Produce energy; returns the amount generated.
    fn generate_energy(&self, _site: &mut Site<'_>) -> f64 {
        0.0
    }

    /// Vent heat out of the reactor; returns the amount self-vented.
    fn dissipate(&self, _site: &mut Site<'_>) -> f64 {
        0.0
    }

    /// Move heat between this part, its neighbors and the hull.
    fn transfer(&self, _site: &mut Site<'_>) {}

    /// Human-readable description used in break reports.
    fn describe(&self) -> String {
        format!("{} (#{})", self.name(), self.id())
    }
}

/// Clamp `heat` into a component's `[0, max_heat]` range.
///
/// Shared body of [`ReactorComponent::adjust_heat`], callable from overrides
/// that add bookkeeping around it.
pub fn absorb_heat<C>(component: &C, state: &mut CellState, heat: f64) -> f64
where
    C: ReactorComponent + ?Sized,
{
    if !component.is_heat_acceptor(state) {
        return heat;
    }
    let max_heat = component.max_heat();
    let mut next = state.heat + heat;
    let mut rejected = 0.0;
    if next > max_heat {
        rejected = next - max_heat;
        next = max_heat;
    } else if next < 0.0 {
        rejected = next;
        next = 0.0;
    }
    state.heat = next;
    state.max_reached_heat = state.max_reached_heat.max(next);
    rejected
}

/// Component lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactoryError {
    #[error("Unknown component id {0}")]
    UnknownId(i32),
    #[error("Unknown component name {0:?}")]
    UnknownName(String),
}

/// Source of component instances.
pub trait ComponentFactory: Send + Sync {
    /// Prototype for an id.
    fn default_component(&self, id: i32) -> Option<&dyn ReactorComponent>;

    /// Prototype for a name.
    fn default_component_by_name(&self, name: &str) -> Option<&dyn ReactorComponent>;

    /// Fresh instance for an id.
    fn create(&self, id: i32) -> Result<Box<dyn ReactorComponent>, FactoryError> {
        self.default_component(id)
            .map(|c| c.clone_boxed())
            .ok_or(FactoryError::UnknownId(id))
    }

    /// Fresh instance for a name.
    fn create_by_name(&self, name: &str) -> Result<Box<dyn ReactorComponent>, FactoryError> {
        self.default_component_by_name(name)
            .map(|c| c.clone_boxed())
            .ok_or_else(|| FactoryError::UnknownName(name.to_string()))
    }

    /// Number of known components.
    fn count(&self) -> usize;
}
