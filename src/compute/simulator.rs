//! Tick-based reactor simulation.
//!
//! [`ReactorSimulator::run`] drives one full cycle over a [`Reactor`]:
//! heat-up, operation (with optional pulsing and automated replacement),
//! breakage bookkeeping and a passive cooldown, and returns an immutable
//! [`SimulationResult`].
//!
//! A simulator instance carries scratch state across the ticks of one run
//! and must be reset with [`ReactorSimulator::reset_state`] before it is
//! used again.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::schema::ReactorSettings;

use super::component::{Coolant, TickFlux};
use super::reactor::Reactor;

/// Ticks after which heating and cooling start being averaged.
const WARMUP_TICKS: u32 = 20;

/// Minimum run length for which heating and cooling averages are reported.
const MIN_REPORT_TICKS: u32 = 40;

/// Hard ceiling on passive cooldown ticks.
const MAX_COOLDOWN_TICKS: u32 = 50_000;

/// Hull heat fractions tracked as thresholds, in increasing order.
const HEAT_THRESHOLDS: [f64; 5] = [0.4, 0.5, 0.7, 0.85, 1.0];

/// Base explosion power before component offsets and multipliers.
const BASE_EXPLOSION_POWER: f64 = 10.0;

/// Unit the reactor's output is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutputUnit {
    /// Electrical output (EU/t).
    Eu,
    /// Heat output of a fluid reactor (HU/s).
    Hu,
}

/// Aggregate output over a run (or the part of it before an event).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OutputStats {
    pub total: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// Output per fuel rod.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Efficiency {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// First occurrence of a component breaking or a rod depleting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakEvent {
    pub tick: u32,
    pub row: usize,
    pub col: usize,
    pub description: String,
    /// Output accumulated up to and including `tick`.
    pub output: OutputStats,
    pub efficiency: Option<Efficiency>,
    /// Hull temperature range seen up to `tick`.
    pub min_temp: f64,
    pub max_temp: f64,
}

/// First tick at which hull heat crossed each threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ThresholdTicks {
    pub heat_40: Option<u32>,
    pub heat_50: Option<u32>,
    pub heat_70: Option<u32>,
    pub heat_85: Option<u32>,
    pub heat_100: Option<u32>,
    /// First return below 50% after having reached it.
    pub below_50: Option<u32>,
}

impl ThresholdTicks {
    fn slot(&mut self, index: usize) -> &mut Option<u32> {
        match index {
            0 => &mut self.heat_40,
            1 => &mut self.heat_50,
            2 => &mut self.heat_70,
            3 => &mut self.heat_85,
            _ => &mut self.heat_100,
        }
    }
}

/// Active and inactive streaks of a pulsed or automated reactor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PulseStats {
    pub active_ticks: u32,
    pub inactive_ticks: u32,
    pub min_active_streak: Option<u32>,
    pub max_active_streak: u32,
    pub min_inactive_streak: Option<u32>,
    pub max_inactive_streak: u32,
}

/// Heating and cooling per tick, averaged past the warm-up window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HeatingCooling {
    pub hull_heating: f64,
    pub component_heating: f64,
    pub hull_cooling: f64,
    pub hull_cooling_capacity: f64,
    pub vent_cooling: f64,
    pub vent_cooling_capacity: f64,
}

/// Peak cooling figures compared against peak heat generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CoolingSummary {
    pub effective_vent_cooling: f64,
    pub vent_cooling_capacity: f64,
    pub cell_cooling: f64,
    pub condensator_cooling: f64,
    pub max_generated_heat: f64,
    /// Total cooling minus peak heat generation (negative means excess heating).
    pub excess_cooling: f64,
}

/// Passive cooldown after a run that did not explode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Cooldown {
    /// Cooldown ticks simulated.
    pub ticks: u32,
    /// Last cooldown tick at which the hull held no heat.
    pub hull_cooled_at: Option<u32>,
    /// Hull heat left after cooldown.
    pub residual_heat: f64,
}

/// Per-component report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentReport {
    pub row: usize,
    pub col: usize,
    pub name: String,
    pub max_reached_heat: f64,
    pub cooldown_ticks: Option<u32>,
    /// Diagnostic lines, only filled when logging is enabled.
    pub info: Vec<String>,
}

/// Immutable record of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub unit: OutputUnit,
    pub thresholds: ThresholdTicks,
    pub total_ticks: u32,
    pub rod_count: u32,
    pub min_temp: f64,
    pub max_temp: f64,
    pub exploded: bool,
    /// Output over the whole run; `None` when the reactor exploded.
    pub output: Option<OutputStats>,
    pub efficiency: Option<Efficiency>,
    pub first_broken: Option<BreakEvent>,
    pub first_depleted: Option<BreakEvent>,
    /// Replacement counts by component name.
    pub replaced: BTreeMap<String, u32>,
    pub redstone_used: u32,
    pub lapis_used: u32,
    pub pulse: PulseStats,
    pub cooldown: Option<Cooldown>,
    pub explosion_power: Option<f64>,
    pub heating_cooling: Option<HeatingCooling>,
    pub cooling: CoolingSummary,
    pub components: Vec<ComponentReport>,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl SimulationResult {
    /// Average output over the run, zero when there is none.
    pub fn avg_output(&self) -> f64 {
        self.output.map_or(0.0, |o| o.avg)
    }

    /// Whether any non-fuel component broke.
    pub fn any_component_broken(&self) -> bool {
        self.first_broken.is_some()
    }

    /// Copy with the timing zeroed, for comparing outcomes.
    pub fn without_timing(&self) -> Self {
        Self {
            elapsed: Duration::ZERO,
            ..self.clone()
        }
    }
}

/// Running per-tick output extremes.
#[derive(Debug, Clone, Copy)]
struct OutputRange {
    min_eu: f64,
    max_eu: f64,
    min_heat: f64,
    max_heat: f64,
}

impl Default for OutputRange {
    fn default() -> Self {
        Self {
            min_eu: f64::MAX,
            max_eu: 0.0,
            min_heat: f64::MAX,
            max_heat: 0.0,
        }
    }
}

impl OutputRange {
    fn update(&mut self, eu: f64, heat: f64) {
        self.min_eu = self.min_eu.min(eu);
        self.max_eu = self.max_eu.max(eu);
        self.min_heat = self.min_heat.min(heat);
        self.max_heat = self.max_heat.max(heat);
    }
}

fn observed_min(value: f64) -> f64 {
    if value == f64::MAX { 0.0 } else { value }
}

/// Streak tracker for the pulse sub-machine.
#[derive(Debug, Clone, Copy, Default)]
struct PulseTracker {
    stats: PulseStats,
    current_active: u32,
    current_inactive: u32,
}

impl PulseTracker {
    fn close_active(&mut self) {
        let streak = self.current_active;
        let min = self.stats.min_active_streak.map_or(streak, |m| m.min(streak));
        self.stats.min_active_streak = Some(min);
        self.stats.max_active_streak = self.stats.max_active_streak.max(streak);
        self.current_active = 0;
    }

    fn close_inactive(&mut self) {
        let streak = self.current_inactive;
        let min = self
            .stats
            .min_inactive_streak
            .map_or(streak, |m| m.min(streak));
        self.stats.min_inactive_streak = Some(min);
        self.stats.max_inactive_streak = self.stats.max_inactive_streak.max(streak);
        self.current_inactive = 0;
    }
}

/// Heating and cooling totals accumulated past the warm-up window.
#[derive(Debug, Clone, Copy, Default)]
struct FluxTotals {
    hull_heating: f64,
    component_heating: f64,
    hull_cooling: f64,
    vent_cooling: f64,
}

impl FluxTotals {
    fn add(&mut self, flux: &TickFlux) {
        self.hull_heating += flux.hull_heating;
        self.component_heating += flux.component_heating;
        self.hull_cooling += flux.hull_cooling;
        self.vent_cooling += flux.vent_cooling;
    }
}

/// Running totals passed to breakage bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
struct RunTotals {
    eu: f64,
    vented: f64,
    min_temp: f64,
    max_temp: f64,
}

/// Discrete-time reactor simulator.
#[derive(Debug, Clone)]
pub struct ReactorSimulator {
    active: bool,
    pause_timer: u32,
    reached: [bool; 5],
    reached_below_50: bool,
    pulse: PulseTracker,
    outputs: OutputRange,
    all_depleted: bool,
    components_intact: bool,
    any_depleted: bool,
    redstone_used: u32,
    lapis_used: u32,
    ticks: u32,
    cooldown_ticks: u32,
    rod_count: u32,
    flux_totals: FluxTotals,
    heating_cooling: Option<HeatingCooling>,
    heating_cooling_reported: bool,
    replaced: BTreeMap<String, u32>,
    first_broken: Option<BreakEvent>,
    first_depleted: Option<BreakEvent>,
    thresholds: ThresholdTicks,
    used: bool,
}

impl Default for ReactorSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactorSimulator {
    /// Create a simulator ready for its first run.
    pub fn new() -> Self {
        Self {
            active: true,
            pause_timer: 0,
            reached: [false; 5],
            reached_below_50: false,
            pulse: PulseTracker::default(),
            outputs: OutputRange::default(),
            all_depleted: false,
            components_intact: true,
            any_depleted: false,
            redstone_used: 0,
            lapis_used: 0,
            ticks: 0,
            cooldown_ticks: 0,
            rod_count: 0,
            flux_totals: FluxTotals::default(),
            heating_cooling: None,
            heating_cooling_reported: false,
            replaced: BTreeMap::new(),
            first_broken: None,
            first_depleted: None,
            thresholds: ThresholdTicks::default(),
            used: false,
        }
    }

    /// Clear all per-run state so the instance can run again.
    pub fn reset_state(&mut self) {
        *self = Self::new();
    }

    /// Whether a run has happened since the last reset.
    pub fn needs_reset(&self) -> bool {
        self.used
    }

    /// Ticks simulated so far in the current run.
    pub fn reactor_ticks(&self) -> u32 {
        self.ticks
    }

    /// Cooldown ticks simulated so far in the current run.
    pub fn cooldown_ticks(&self) -> u32 {
        self.cooldown_ticks
    }

    /// Run one full simulation.
    pub fn run(&mut self, reactor: &mut Reactor, logging_enabled: bool) -> SimulationResult {
        self.run_with_sink(reactor, logging_enabled, |_| {})
    }

    /// Run one full simulation, streaming diagnostic lines to `sink`.
    pub fn run_with_sink<F>(
        &mut self,
        reactor: &mut Reactor,
        logging_enabled: bool,
        mut sink: F,
    ) -> SimulationResult
    where
        F: FnMut(&str),
    {
        debug_assert!(
            !self.used,
            "ReactorSimulator must be reset between runs"
        );
        self.used = true;
        let start = Instant::now();

        sink("Simulation started");
        let occupied = reactor.prepare_run();
        let settings = reactor.settings().clone();
        let max_heat = reactor.hull().max_heat;
        let starting_heat = reactor.hull().heat;

        for (i, fraction) in HEAT_THRESHOLDS.iter().enumerate().take(4) {
            self.reached[i] = starting_heat >= fraction * max_heat;
        }

        self.rod_count = occupied
            .iter()
            .filter_map(|&i| reactor.component(i))
            .map(|c| c.rod_count())
            .sum();

        let mut totals = RunTotals {
            min_temp: starting_heat,
            max_temp: starting_heat,
            ..Default::default()
        };
        let mut max_generated_heat: f64 = 0.0;

        loop {
            self.ticks += 1;
            reactor.hull_mut().clear_tick();

            for &i in &occupied {
                reactor.with_site(i, |component, site| {
                    site.state_mut().flux = TickFlux::default();
                    component.pre_tick(site);
                });
            }

            if self.active {
                self.all_depleted = true;
            }

            let mut generated_heat = 0.0;
            for &i in &occupied {
                let active = self.active;
                let all_depleted = &mut self.all_depleted;
                reactor.with_site(i, |component, site| {
                    if component.is_broken(site.state()) {
                        return;
                    }
                    if *all_depleted && component.rod_count() > 0 {
                        *all_depleted = false;
                    }
                    if active {
                        generated_heat += component.generate_heat(site);
                    }
                    component.dissipate(site);
                    component.transfer(site);
                });
            }

            let heat = reactor.hull().heat;
            totals.max_temp = totals.max_temp.max(heat);
            totals.min_temp = totals.min_temp.min(heat);
            self.check_thresholds(heat, max_heat, &mut sink);
            max_generated_heat = max_generated_heat.max(generated_heat);

            if self.active {
                for &i in &occupied {
                    reactor.with_site(i, |component, site| {
                        if !component.is_broken(site.state()) {
                            component.generate_energy(site);
                        }
                    });
                }
            }

            let last_eu = reactor.hull().eu_output;
            let last_vented = reactor.hull().vented_heat;
            totals.eu += last_eu;
            totals.vented += last_vented;

            let heat = reactor.hull().heat;
            if heat <= max_heat {
                if settings.pulsed || settings.automated {
                    self.step_pulse(&settings, heat);
                }
                self.outputs.update(last_eu, last_vented);
            }

            if self.ticks > WARMUP_TICKS {
                for &i in &occupied {
                    if let Some(state) = reactor.state(i) {
                        self.flux_totals.add(&state.flux);
                    }
                }
            }

            self.handle_automation(reactor, &occupied, &settings, logging_enabled);
            self.handle_breakage(reactor, &occupied, &totals, logging_enabled, &mut sink);

            let keep_running = reactor.hull().heat < max_heat
                && (!self.all_depleted || last_eu > 0.0 || last_vented > 0.0)
                && self.ticks < settings.max_simulation_ticks;
            if !keep_running {
                break;
            }
        }

        sink(&format!("Reactor minimum temperature: {:.2}", totals.min_temp));
        sink(&format!("Reactor maximum temperature: {:.2}", totals.max_temp));

        let exploded = reactor.hull().heat >= max_heat;
        let unit = if settings.fluid {
            OutputUnit::Hu
        } else {
            OutputUnit::Eu
        };
        let mut output = None;
        let mut efficiency = None;
        let mut cooldown = None;
        let mut explosion_power = None;

        if exploded {
            sink(&format!("Reactor overheated at tick {}", self.ticks));
            let mut power = BASE_EXPLOSION_POWER;
            let mut multiplier = 1.0;
            for &i in &occupied {
                if let (Some(component), Some(state)) = (reactor.component(i), reactor.state(i)) {
                    power += component.explosion_power_offset(state);
                    multiplier *= component.explosion_power_multiplier();
                }
            }
            let power = power * multiplier;
            sink(&format!("Explosion power: {power:.2}"));
            explosion_power = Some(power);
        } else {
            sink(&format!(
                "Reactor ran {} ticks without exploding",
                self.ticks
            ));
            if settings.pulsed {
                let pulse = &self.pulse.stats;
                sink(&format!(
                    "Active for {} ticks, inactive for {} ticks",
                    pulse.active_ticks, pulse.inactive_ticks
                ));
            }
            if !self.replaced.is_empty() {
                sink(&format!("Components replaced: {}", self.replaced_summary()));
            }
            if self.ticks > 0 {
                let stats = self.output_stats(settings.fluid, totals.eu, totals.vented);
                sink(&format!(
                    "{unit:?} output: total {:.2}, average {:.2}, min {:.2}, max {:.2}",
                    stats.total, stats.avg, stats.min, stats.max
                ));
                output = Some(stats);
                efficiency = self.efficiency(settings.fluid, totals.eu, totals.vented);
            }
            cooldown = Some(self.cool_down(reactor, &occupied, logging_enabled, &mut sink));
        }

        let cooling = self.cooling_summary(reactor, &occupied, settings.fluid, max_generated_heat, logging_enabled, &mut sink);
        self.report_heating_cooling(reactor, &occupied, &mut sink);

        if self.redstone_used > 0 {
            sink(&format!("Redstone used: {}", self.redstone_used));
        }
        if self.lapis_used > 0 {
            sink(&format!("Lapis used: {}", self.lapis_used));
        }

        let components = occupied
            .iter()
            .filter_map(|&i| {
                let component = reactor.component(i)?;
                let state = reactor.state(i)?;
                let (row, col) = reactor.position(i);
                Some(ComponentReport {
                    row,
                    col,
                    name: component.name().to_string(),
                    max_reached_heat: state.max_reached_heat,
                    cooldown_ticks: state.cooldown_ticks,
                    info: state.info.clone(),
                })
            })
            .collect();

        let result = SimulationResult {
            unit,
            thresholds: self.thresholds,
            total_ticks: self.ticks,
            rod_count: self.rod_count,
            min_temp: totals.min_temp,
            max_temp: totals.max_temp,
            exploded,
            output,
            efficiency,
            first_broken: self.first_broken.clone(),
            first_depleted: self.first_depleted.clone(),
            replaced: self.replaced.clone(),
            redstone_used: self.redstone_used,
            lapis_used: self.lapis_used,
            pulse: self.pulse.stats,
            cooldown,
            explosion_power,
            heating_cooling: self.heating_cooling,
            cooling,
            components,
            elapsed: start.elapsed(),
        };

        log::trace!(
            "simulated {} ticks (exploded: {}) in {:?}",
            result.total_ticks,
            result.exploded,
            result.elapsed
        );
        result
    }

    fn check_thresholds<F: FnMut(&str)>(&mut self, heat: f64, max_heat: f64, sink: &mut F) {
        if heat < 0.5 * max_heat && !self.reached_below_50 && self.reached[1] {
            self.reached_below_50 = true;
            self.thresholds.below_50 = Some(self.ticks);
            sink(&format!("Hull heat dropped below 50% at tick {}", self.ticks));
        }
        for (i, fraction) in HEAT_THRESHOLDS.iter().enumerate() {
            if heat >= fraction * max_heat && !self.reached[i] {
                self.reached[i] = true;
                *self.thresholds.slot(i) = Some(self.ticks);
                sink(&format!(
                    "Hull heat reached {:.0}% at tick {}",
                    fraction * 100.0,
                    self.ticks
                ));
            }
        }
    }

    fn step_pulse(&mut self, settings: &ReactorSettings, heat: f64) {
        let phase = self.ticks % settings.pulse_period().max(1);
        if self.active {
            self.pulse.stats.active_ticks += 1;
            self.pulse.current_active += 1;
            if settings.pulsed && (heat >= settings.suspend_temp || phase >= settings.on_pulse) {
                self.active = false;
                self.pulse.close_active();
            }
        } else {
            self.pulse.stats.inactive_ticks += 1;
            self.pulse.current_inactive += 1;
            if settings.automated && self.pause_timer > 0 {
                self.pause_timer -= 1;
            } else if settings.pulsed && heat <= settings.resume_temp && phase < settings.on_pulse {
                self.active = true;
                self.pulse.close_inactive();
            }
        }
    }

    fn handle_automation(
        &mut self,
        reactor: &mut Reactor,
        occupied: &[usize],
        settings: &ReactorSettings,
        logging_enabled: bool,
    ) {
        let tick = self.ticks;
        for &i in occupied {
            let outcome = reactor.with_site(i, |component, site| {
                let mut replaced = None;
                if settings.automated {
                    let tuning = site.tuning();
                    let threshold = tuning.automation_threshold;
                    let state = site.state_mut();
                    let replace = if component.max_heat() > 1.0 {
                        let rising = threshold > tuning.initial_heat && state.heat >= threshold;
                        let falling = threshold < tuning.initial_heat && state.heat <= threshold;
                        if rising || falling {
                            state.heat = tuning.initial_heat;
                        }
                        rising || falling
                    } else if component.is_broken(state)
                        || (component.max_damage() > 1.0 && state.damage >= threshold)
                    {
                        state.damage = 0.0;
                        true
                    } else {
                        false
                    };
                    if replace {
                        if logging_enabled {
                            state.info.push(format!("Replaced at tick {tick}"));
                        }
                        replaced = Some((component.name().to_string(), tuning.reactor_pause));
                    }
                }

                let mut coolant = None;
                if settings.coolant_injectors && component.needs_coolant(site.state()) {
                    component.inject_coolant(site.state_mut());
                    coolant = component.coolant();
                }
                (replaced, coolant)
            });

            let Some((replaced, coolant)) = outcome else {
                continue;
            };
            if let Some((name, pause)) = replaced {
                *self.replaced.entry(name).or_insert(0) += 1;
                if pause > 0 {
                    self.active = false;
                    self.pause_timer = self.pause_timer.max(pause);
                    self.pulse.close_active();
                }
            }
            match coolant {
                Some(Coolant::Redstone) => self.redstone_used += 1,
                Some(Coolant::Lapis) => self.lapis_used += 1,
                None => {}
            }
        }
    }

    fn handle_breakage<F: FnMut(&str)>(
        &mut self,
        reactor: &mut Reactor,
        occupied: &[usize],
        totals: &RunTotals,
        logging_enabled: bool,
        sink: &mut F,
    ) {
        let tick = self.ticks;
        for &i in occupied {
            let newly_broken = reactor.with_site(i, |component, site| {
                let state = site.state_mut();
                if state.break_recorded || !component.is_broken(state) {
                    return None;
                }
                state.break_recorded = true;
                if logging_enabled {
                    state.info.push(format!("Broke at tick {tick}"));
                }
                Some((component.rod_count(), component.describe()))
            });
            let Some(Some((rods, description))) = newly_broken else {
                continue;
            };

            let (row, col) = reactor.position(i);
            let fluid = reactor.settings().fluid;
            let event = BreakEvent {
                tick,
                row,
                col,
                description,
                output: self.output_stats(fluid, totals.eu, totals.vented),
                efficiency: self.efficiency(fluid, totals.eu, totals.vented),
                min_temp: totals.min_temp,
                max_temp: totals.max_temp,
            };

            if rods == 0 {
                if self.components_intact {
                    self.components_intact = false;
                    sink(&format!(
                        "First component broken: {} at row {row}, col {col}, tick {tick}",
                        event.description
                    ));
                    self.first_broken = Some(event);
                }
            } else if !self.any_depleted {
                self.any_depleted = true;
                sink(&format!(
                    "First rod depleted: {} at row {row}, col {col}, tick {tick}",
                    event.description
                ));
                self.first_depleted = Some(event);
            }
            self.report_heating_cooling(reactor, occupied, sink);
        }
    }

    fn output_stats(&self, fluid: bool, total_eu: f64, total_vented: f64) -> OutputStats {
        let ticks = f64::from(self.ticks.max(1));
        let range = &self.outputs;
        if fluid {
            OutputStats {
                total: 40.0 * total_vented,
                avg: 2.0 * total_vented / ticks,
                min: 2.0 * observed_min(range.min_heat),
                max: 2.0 * range.max_heat,
            }
        } else {
            OutputStats {
                total: total_eu,
                avg: total_eu / (ticks * 20.0),
                min: observed_min(range.min_eu) / 20.0,
                max: range.max_eu / 20.0,
            }
        }
    }

    fn efficiency(&self, fluid: bool, total_eu: f64, total_vented: f64) -> Option<Efficiency> {
        if self.rod_count == 0 {
            return None;
        }
        let rods = f64::from(self.rod_count);
        let ticks = f64::from(self.ticks.max(1));
        let range = &self.outputs;
        Some(if fluid {
            Efficiency {
                avg: total_vented / ticks / 4.0 / rods,
                min: observed_min(range.min_heat) / 4.0 / rods,
                max: range.max_heat / 4.0 / rods,
            }
        } else {
            Efficiency {
                avg: total_eu / ticks / 100.0 / rods,
                min: observed_min(range.min_eu) / 100.0 / rods,
                max: range.max_eu / 100.0 / rods,
            }
        })
    }

    fn replaced_summary(&self) -> String {
        self.replaced
            .iter()
            .map(|(name, count)| format!("{count} {name}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn cool_down<F: FnMut(&str)>(
        &mut self,
        reactor: &mut Reactor,
        occupied: &[usize],
        logging_enabled: bool,
        sink: &mut F,
    ) -> Cooldown {
        let mut component_heat = 0.0;
        for &i in occupied {
            reactor.with_site(i, |component, site| {
                let state = site.state_mut();
                if component.is_broken(state) || state.heat <= 0.0 {
                    return;
                }
                component_heat += state.heat;
                state.needs_cooldown = true;
                if logging_enabled {
                    state.info.push(format!("Remaining heat: {:.2}", state.heat));
                }
            });
        }

        if reactor.hull().heat > 0.0 {
            sink(&format!(
                "Reactor remaining heat: {:.2}",
                reactor.hull().heat
            ));
        }
        if reactor.hull().heat == 0.0 && component_heat == 0.0 {
            sink("No cooldown needed");
            return Cooldown {
                ticks: 0,
                hull_cooled_at: Some(0),
                residual_heat: 0.0,
            };
        }

        let mut hull_cooled_at = None;
        loop {
            reactor.hull_mut().clear_tick();
            if reactor.hull().heat == 0.0 {
                hull_cooled_at = Some(self.cooldown_ticks);
            }
            for &i in occupied {
                reactor.with_site(i, |component, site| {
                    if !component.is_broken(site.state()) {
                        component.dissipate(site);
                        component.transfer(site);
                    }
                });
            }
            let vented = reactor.hull().vented_heat;
            self.cooldown_ticks += 1;

            let cooldown_tick = self.cooldown_ticks;
            for &i in occupied {
                reactor.with_site(i, |component, site| {
                    let state = site.state_mut();
                    if !component.is_broken(state) && state.needs_cooldown && state.heat == 0.0 {
                        state.needs_cooldown = false;
                        state.cooldown_ticks = Some(cooldown_tick);
                        if logging_enabled {
                            state.info.push(format!("Cooled down after {cooldown_tick} ticks"));
                        }
                    }
                });
            }

            if vented <= 0.0 || self.cooldown_ticks >= MAX_COOLDOWN_TICKS {
                break;
            }
        }

        let residual_heat = reactor.hull().heat;
        match hull_cooled_at {
            Some(at) if residual_heat == 0.0 => {
                sink(&format!("Reactor cooled down in {at} ticks"));
            }
            Some(at) => sink(&format!(
                "Reactor kept {residual_heat:.2} heat after reaching zero at tick {at}"
            )),
            None => {}
        }
        sink(&format!("Total cooldown time: {} ticks", self.cooldown_ticks));

        Cooldown {
            ticks: self.cooldown_ticks,
            hull_cooled_at,
            residual_heat,
        }
    }

    fn cooling_summary<F: FnMut(&str)>(
        &self,
        reactor: &mut Reactor,
        occupied: &[usize],
        fluid: bool,
        max_generated_heat: f64,
        logging_enabled: bool,
        sink: &mut F,
    ) -> CoolingSummary {
        let mut summary = CoolingSummary {
            max_generated_heat,
            ..Default::default()
        };

        for &i in occupied {
            reactor.with_site(i, |component, site| {
                let capacity = component.vent_cooling_capacity(site);
                let max_heat = component.max_heat();
                let state = site.state_mut();
                let mut lines = Vec::new();
                if capacity > 0.0 {
                    lines.push(format!(
                        "Used {:.2} of {capacity:.2} vent cooling",
                        state.best_vent_cooling
                    ));
                    summary.effective_vent_cooling += state.best_vent_cooling;
                    summary.vent_cooling_capacity += capacity;
                } else if state.best_cell_cooling > 0.0 {
                    lines.push(format!("Received {:.2} heat", state.best_cell_cooling));
                    summary.cell_cooling += state.best_cell_cooling;
                } else if state.best_condensator_cooling > 0.0 {
                    lines.push(format!("Received {:.2} heat", state.best_condensator_cooling));
                    summary.condensator_cooling += state.best_condensator_cooling;
                } else if state.max_heat_generated > 0.0 {
                    if !fluid && state.max_eu_generated > 0.0 {
                        lines.push(format!(
                            "Generated {:.2} to {:.2} EU per tick",
                            observed_min(state.min_eu_generated),
                            state.max_eu_generated
                        ));
                    }
                    lines.push(format!(
                        "Generated {:.2} to {:.2} heat per tick",
                        observed_min(state.min_heat_generated),
                        state.max_heat_generated
                    ));
                }
                if state.max_reached_heat > 0.0 {
                    lines.push(format!(
                        "Reached {:.2} of {max_heat:.2} heat",
                        state.max_reached_heat
                    ));
                }
                if logging_enabled {
                    state.info.extend(lines);
                }
            });
        }

        let total_cooling =
            summary.effective_vent_cooling + summary.cell_cooling + summary.condensator_cooling;
        summary.excess_cooling = total_cooling - max_generated_heat;

        if summary.vent_cooling_capacity > 0.0 {
            sink(&format!(
                "Total vent cooling: {:.2} of {:.2}",
                summary.effective_vent_cooling, summary.vent_cooling_capacity
            ));
        }
        if summary.cell_cooling > 0.0 {
            sink(&format!("Total cell cooling: {:.2}", summary.cell_cooling));
        }
        if summary.condensator_cooling > 0.0 {
            sink(&format!(
                "Total condensator cooling: {:.2}",
                summary.condensator_cooling
            ));
        }
        if max_generated_heat > 0.0 {
            sink(&format!("Max heat generated: {max_generated_heat:.2}"));
        }
        if summary.excess_cooling >= 0.0 {
            sink(&format!("Excess cooling: {:.2}", summary.excess_cooling));
        } else {
            sink(&format!("Excess heating: {:.2}", -summary.excess_cooling));
        }
        summary
    }

    /// Record averaged heating and cooling once per run.
    fn report_heating_cooling<F: FnMut(&str)>(
        &mut self,
        reactor: &mut Reactor,
        occupied: &[usize],
        sink: &mut F,
    ) {
        if self.heating_cooling_reported {
            return;
        }
        self.heating_cooling_reported = true;
        if self.ticks < MIN_REPORT_TICKS {
            return;
        }

        let mut hull_capacity = 0.0;
        let mut vent_capacity = 0.0;
        for &i in occupied {
            reactor.with_site(i, |component, site| {
                hull_capacity += component.hull_cooling_capacity();
                vent_capacity += component.vent_cooling_capacity(site);
            });
        }

        let span = f64::from(self.ticks - WARMUP_TICKS);
        let totals = self.flux_totals;
        let report = HeatingCooling {
            hull_heating: totals.hull_heating / span,
            component_heating: totals.component_heating / span,
            hull_cooling: totals.hull_cooling / span,
            hull_cooling_capacity: hull_capacity,
            vent_cooling: totals.vent_cooling / span,
            vent_cooling_capacity: vent_capacity,
        };
        if report.hull_heating > 0.0 {
            sink(&format!("Hull heating: {:.2} per tick", report.hull_heating));
        }
        if report.component_heating > 0.0 {
            sink(&format!(
                "Component heating: {:.2} per tick",
                report.component_heating
            ));
        }
        if hull_capacity > 0.0 {
            sink(&format!(
                "Hull cooling: {:.2} of {hull_capacity:.2} per tick",
                report.hull_cooling
            ));
        }
        if vent_capacity > 0.0 {
            sink(&format!(
                "Vent cooling: {:.2} of {vent_capacity:.2} per tick",
                report.vent_cooling
            ));
        }
        self.heating_cooling = Some(report);
    }
}
