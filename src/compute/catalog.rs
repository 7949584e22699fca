//! Reference component catalog.
//!
//! One type per physical family (fuel rods, reflectors, vents, exchangers,
//! coolant cells, platings, condensators). The simulator only ever sees
//! them through [`ReactorComponent`].

use serde::{Deserialize, Serialize};

use super::component::{
    CellState, ComponentFactory, Coolant, ReactorComponent, Site, absorb_heat,
};

/// Output ruleset applied to fuel rods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ruleset {
    /// Plain IC2 behavior.
    #[default]
    Classic,
    /// GregTech 5.09: doubled EU, gentler MOX scaling.
    Gt509,
    /// GregTech New Horizons: tenfold EU, gentler MOX scaling.
    Gtnh,
}

/// Uranium, MOX or thorium rods in single, dual or quad packaging.
#[derive(Debug, Clone)]
pub struct FuelRod {
    pub id: i32,
    pub name: &'static str,
    pub base_name: &'static str,
    pub max_damage: f64,
    pub energy_mult: f64,
    pub heat_mult: f64,
    pub rods: u32,
    pub mox: bool,
    pub ruleset: Ruleset,
}

impl FuelRod {
    fn pulses(&self, site: &Site<'_>) -> f64 {
        let reflectors = site
            .neighbors()
            .iter()
            .filter(|&&n| site.is_neutron_reflector(n))
            .count() as u32;
        let own = match self.rods {
            1 => 1,
            2 => 2,
            _ => 3,
        };
        f64::from(reflectors + own)
    }
}

impl ReactorComponent for FuelRod {
    fn id(&self) -> i32 {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn base_name(&self) -> &str {
        self.base_name
    }

    fn max_damage(&self) -> f64 {
        self.max_damage
    }

    fn rod_count(&self) -> u32 {
        self.rods
    }

    fn is_neutron_reflector(&self, state: &CellState) -> bool {
        !self.is_broken(state)
    }

    fn explosion_power_offset(&self, state: &CellState) -> f64 {
        if self.is_broken(state) {
            0.0
        } else {
            2.0 * f64::from(self.rods)
        }
    }

    fn generate_heat(&self, site: &mut Site<'_>) -> f64 {
        let pulses = self.pulses(site);
        let mut heat = (self.heat_mult * pulses * (pulses + 1.0)).floor();
        if self.mox && site.settings().fluid && site.hull().heat_fraction() > 0.5 {
            heat *= 2.0;
        }
        site.state_mut().record_heat_generated(heat);

        let acceptors = site.heat_acceptors();
        if acceptors.is_empty() {
            site.hull_mut().adjust_heat(heat);
            site.state_mut().flux.hull_heating = heat;
            return heat;
        }

        site.state_mut().flux.component_heating = heat;
        let count = acceptors.len() as f64;
        let share = (heat / count).floor();
        let remainder = heat - share * count;

        // Heat a neighbor cannot hold ends up in the hull.
        let mut overflow = 0.0;
        for &cell in &acceptors {
            overflow += site.adjust_heat_of(cell, share);
        }
        if remainder > 0.0 {
            overflow += site.adjust_heat_of(acceptors[0], remainder);
        }
        if overflow > 0.0 {
            site.hull_mut().adjust_heat(overflow);
        }
        heat
    }

    fn generate_energy(&self, site: &mut Site<'_>) -> f64 {
        let mut energy = self.energy_mult * self.pulses(site);
        let fraction = site.hull().heat_fraction();
        match self.ruleset {
            Ruleset::Gt509 | Ruleset::Gtnh => {
                energy *= if self.ruleset == Ruleset::Gt509 {
                    2.0
                } else {
                    10.0
                };
                if self.mox {
                    energy *= 1.0 + 1.5 * fraction;
                }
            }
            Ruleset::Classic => {
                if self.mox {
                    energy *= 1.0 + 4.0 * fraction;
                }
            }
        }
        site.hull_mut().add_output(energy);
        site.state_mut().record_eu_generated(energy);
        site.apply_own_damage(1.0);
        energy
    }
}

/// Neutron reflector; wears down by the rod count of its neighbors.
#[derive(Debug, Clone)]
pub struct Reflector {
    pub id: i32,
    pub name: &'static str,
    pub max_damage: f64,
}

impl ReactorComponent for Reflector {
    fn id(&self) -> i32 {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn base_name(&self) -> &str {
        "neutronReflector"
    }

    fn max_damage(&self) -> f64 {
        self.max_damage
    }

    fn is_neutron_reflector(&self, state: &CellState) -> bool {
        !self.is_broken(state)
    }

    fn generate_heat(&self, site: &mut Site<'_>) -> f64 {
        let wear: u32 = site.neighbors().iter().map(|&n| site.rod_count(n)).sum();
        site.apply_own_damage(f64::from(wear));
        0.0
    }
}

/// Heat vent: draws from the hull, vents itself, and cools its neighbors.
#[derive(Debug, Clone)]
pub struct Vent {
    pub id: i32,
    pub name: &'static str,
    pub max_heat: f64,
    pub self_vent: f64,
    pub hull_draw: f64,
    pub side_vent: f64,
}

impl ReactorComponent for Vent {
    fn id(&self) -> i32 {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn base_name(&self) -> &str {
        "heatVent"
    }

    fn max_heat(&self) -> f64 {
        self.max_heat
    }

    fn dissipate(&self, site: &mut Site<'_>) -> f64 {
        let drawn = self.hull_draw.min(site.hull().heat);
        if drawn > 0.0 {
            site.hull_mut().adjust_heat(-drawn);
            let rejected = site.adjust_own_heat(drawn);
            if rejected > 0.0 {
                site.hull_mut().adjust_heat(rejected);
            }
        }
        site.state_mut().flux.hull_cooling = drawn;

        let vented = self.self_vent.min(site.state().heat);
        site.hull_mut().vent(vented);
        site.adjust_own_heat(-vented);
        let mut vent_cooling = vented;

        if self.side_vent > 0.0 {
            for &cell in site.neighbors() {
                if !site.is_coolable(cell) {
                    continue;
                }
                let rejected = site.adjust_heat_of(cell, -self.side_vent);
                let cooled = self.side_vent + rejected;
                site.hull_mut().vent(cooled);
                vent_cooling += cooled;
            }
        }

        let state = site.state_mut();
        state.flux.vent_cooling = vent_cooling;
        state.best_vent_cooling = state.best_vent_cooling.max(vent_cooling);
        vented
    }

    fn vent_cooling_capacity(&self, site: &Site<'_>) -> f64 {
        let coolable = site
            .neighbors()
            .iter()
            .filter(|&&n| site.is_coolable(n))
            .count() as f64;
        self.self_vent + self.side_vent * coolable
    }

    fn hull_cooling_capacity(&self) -> f64 {
        self.hull_draw
    }
}

/// Heat exchanger balancing heat percentages with neighbors and the hull.
#[derive(Debug, Clone)]
pub struct Exchanger {
    pub id: i32,
    pub name: &'static str,
    pub max_heat: f64,
    pub switch_side: u32,
    pub switch_reactor: u32,
}

/// Round half up, matching the integer rounding the exchange rates assume.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn round_tenth(value: f64) -> f64 {
    round_half_up(value * 10.0) / 10.0
}

/// Shrink the transfer when both sides are nearly cold.
fn taper(combined: f64, add: f64, limit: u32) -> f64 {
    if combined < 0.25 {
        1.0
    } else if combined < 0.5 {
        f64::from(limit / 8)
    } else if combined < 0.75 {
        f64::from(limit / 4)
    } else if combined < 1.0 {
        f64::from(limit / 2)
    } else {
        add
    }
}

/// Signed transfer: positive moves heat away from the exchanger.
fn direct(add: f64, other_percent: f64, own_percent: f64) -> f64 {
    let other = round_tenth(other_percent);
    let own = round_tenth(own_percent);
    if other > own {
        -add
    } else if other == own {
        0.0
    } else {
        add
    }
}

impl ReactorComponent for Exchanger {
    fn id(&self) -> i32 {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn base_name(&self) -> &str {
        "heatExchanger"
    }

    fn max_heat(&self) -> f64 {
        self.max_heat
    }

    fn transfer(&self, site: &mut Site<'_>) {
        let mut own_delta = 0.0;

        if self.switch_side > 0 {
            for cell in site.heat_acceptors() {
                let own_percent = site.state().heat * 100.0 / self.max_heat;
                let other_max = site.component(cell).map_or(1.0, |c| c.max_heat());
                let other_percent = site.state_of(cell).heat * 100.0 / other_max;
                let combined = other_percent + own_percent / 2.0;

                let add = (other_max / 100.0 * combined)
                    .trunc()
                    .min(f64::from(self.switch_side));
                let add = taper(combined, add, self.switch_side);
                let add = direct(add, other_percent, own_percent);

                own_delta -= add;
                if add > 0.0 {
                    site.state_mut().flux.component_heating += add;
                }
                own_delta += site.adjust_heat_of(cell, add);
            }
        }

        if self.switch_reactor > 0 {
            let own_percent = site.state().heat * 100.0 / self.max_heat;
            let hull_max = site.hull().max_heat;
            let hull_percent = site.hull().heat * 100.0 / hull_max;
            let combined = hull_percent + own_percent / 2.0;

            let add = round_half_up(hull_max / 100.0 * combined).min(f64::from(self.switch_reactor));
            let add = taper(combined, add, self.switch_reactor);
            let add = direct(add, hull_percent, own_percent);

            own_delta -= add;
            site.hull_mut().adjust_heat(add);
            let flux = &mut site.state_mut().flux;
            if add > 0.0 {
                flux.hull_heating = add;
            } else {
                flux.hull_cooling = -add;
            }
        }

        site.adjust_own_heat(own_delta);
    }

    fn hull_cooling_capacity(&self) -> f64 {
        f64::from(self.switch_reactor)
    }
}

/// Coolant cell: a passive heat store.
#[derive(Debug, Clone)]
pub struct CoolantCell {
    pub id: i32,
    pub name: &'static str,
    pub max_heat: f64,
}

impl ReactorComponent for CoolantCell {
    fn id(&self) -> i32 {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn base_name(&self) -> &str {
        "coolantCell"
    }

    fn max_heat(&self) -> f64 {
        self.max_heat
    }

    fn adjust_heat(&self, state: &mut CellState, heat: f64) -> f64 {
        state.flux.cell_cooling += heat;
        state.best_cell_cooling = state.best_cell_cooling.max(state.flux.cell_cooling);
        absorb_heat(self, state, heat)
    }
}

/// Hull plating: raises hull capacity and dampens explosions.
#[derive(Debug, Clone)]
pub struct Plating {
    pub id: i32,
    pub name: &'static str,
    pub heat_bonus: f64,
    pub explosion_multiplier: f64,
}

impl ReactorComponent for Plating {
    fn id(&self) -> i32 {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn base_name(&self) -> &str {
        "reactorPlating"
    }

    fn hull_heat_bonus(&self) -> f64 {
        self.heat_bonus
    }

    fn explosion_power_multiplier(&self) -> f64 {
        self.explosion_multiplier
    }
}

/// Condensator: absorbs heat only and must be refilled with coolant.
#[derive(Debug, Clone)]
pub struct Condensator {
    pub id: i32,
    pub name: &'static str,
    pub base_name: &'static str,
    pub max_heat: f64,
    pub coolant: Coolant,
}

impl ReactorComponent for Condensator {
    fn id(&self) -> i32 {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn base_name(&self) -> &str {
        self.base_name
    }

    fn max_heat(&self) -> f64 {
        self.max_heat
    }

    fn is_coolable(&self) -> bool {
        false
    }

    fn adjust_heat(&self, state: &mut CellState, heat: f64) -> f64 {
        if heat < 0.0 {
            return heat;
        }
        state.flux.condensator_cooling += heat;
        state.best_condensator_cooling = state
            .best_condensator_cooling
            .max(state.flux.condensator_cooling);
        absorb_heat(self, state, heat)
    }

    fn coolant(&self) -> Option<Coolant> {
        Some(self.coolant)
    }

    fn needs_coolant(&self, state: &CellState) -> bool {
        state.heat >= 0.85 * self.max_heat
    }

    fn inject_coolant(&self, state: &mut CellState) {
        state.heat = 0.0;
    }
}

/// The reference component factory.
#[derive(Debug, Clone)]
pub struct Catalog {
    ruleset: Ruleset,
    components: Vec<Box<dyn ReactorComponent>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(Ruleset::default())
    }
}

impl Catalog {
    /// Build the catalog with fuel rods following `ruleset`.
    pub fn new(ruleset: Ruleset) -> Self {
        let rod = |id, name, base_name, max_damage, energy_mult, heat_mult, rods, mox| {
            Box::new(FuelRod {
                id,
                name,
                base_name,
                max_damage,
                energy_mult,
                heat_mult,
                rods,
                mox,
                ruleset,
            }) as Box<dyn ReactorComponent>
        };
        let vent = |id, name, max_heat, self_vent, hull_draw, side_vent| {
            Box::new(Vent {
                id,
                name,
                max_heat,
                self_vent,
                hull_draw,
                side_vent,
            }) as Box<dyn ReactorComponent>
        };
        let exchanger = |id, name, max_heat, switch_side, switch_reactor| {
            Box::new(Exchanger {
                id,
                name,
                max_heat,
                switch_side,
                switch_reactor,
            }) as Box<dyn ReactorComponent>
        };
        let reflector = |id, name, max_damage| {
            Box::new(Reflector {
                id,
                name,
                max_damage,
            }) as Box<dyn ReactorComponent>
        };
        let cell = |id, name, max_heat| {
            Box::new(CoolantCell { id, name, max_heat }) as Box<dyn ReactorComponent>
        };
        let plating = |id, name, heat_bonus, explosion_multiplier| {
            Box::new(Plating {
                id,
                name,
                heat_bonus,
                explosion_multiplier,
            }) as Box<dyn ReactorComponent>
        };

        let components = vec![
            rod(1, "Uranium Cell", "fuelRodUranium", 20_000.0, 100.0, 2.0, 1, false),
            rod(2, "Dual Uranium Cell", "dualFuelRodUranium", 20_000.0, 200.0, 4.0, 2, false),
            rod(3, "Quad Uranium Cell", "quadFuelRodUranium", 20_000.0, 400.0, 8.0, 4, false),
            rod(4, "MOX Cell", "fuelRodMox", 10_000.0, 100.0, 2.0, 1, true),
            rod(5, "Dual MOX Cell", "dualFuelRodMox", 10_000.0, 200.0, 4.0, 2, true),
            rod(6, "Quad MOX Cell", "quadFuelRodMox", 10_000.0, 400.0, 8.0, 4, true),
            reflector(7, "Neutron Reflector", 30_000.0),
            reflector(8, "Thick Neutron Reflector", 120_000.0),
            vent(9, "Heat Vent", 1_000.0, 6.0, 0.0, 0.0),
            vent(10, "Advanced Heat Vent", 1_000.0, 12.0, 0.0, 0.0),
            vent(11, "Reactor Heat Vent", 1_000.0, 5.0, 5.0, 0.0),
            vent(12, "Component Heat Vent", 1.0, 0.0, 0.0, 4.0),
            vent(13, "Overclocked Heat Vent", 1_000.0, 20.0, 36.0, 0.0),
            cell(14, "10k Coolant Cell", 10_000.0),
            cell(15, "30k Coolant Cell", 30_000.0),
            cell(16, "60k Coolant Cell", 60_000.0),
            exchanger(17, "Heat Exchanger", 2_500.0, 12, 4),
            exchanger(18, "Advanced Heat Exchanger", 10_000.0, 24, 8),
            exchanger(19, "Reactor Heat Exchanger", 5_000.0, 0, 72),
            exchanger(20, "Component Heat Exchanger", 5_000.0, 36, 0),
            plating(21, "Reactor Plating", 1_000.0, 0.95),
            plating(22, "Heat-Capacity Reactor Plating", 1_700.0, 0.99),
            plating(23, "Containment Reactor Plating", 500.0, 0.9),
            Box::new(Condensator {
                id: 24,
                name: "RSH Condensator",
                base_name: "rshCondensator",
                max_heat: 20_000.0,
                coolant: Coolant::Redstone,
            }),
            Box::new(Condensator {
                id: 25,
                name: "LZH Condensator",
                base_name: "lzhCondensator",
                max_heat: 100_000.0,
                coolant: Coolant::Lapis,
            }),
            rod(26, "Thorium Cell", "fuelRodThorium", 50_000.0, 20.0, 0.5, 1, false),
            rod(27, "Dual Thorium Cell", "dualFuelRodThorium", 50_000.0, 40.0, 1.0, 2, false),
            rod(28, "Quad Thorium Cell", "quadFuelRodThorium", 50_000.0, 80.0, 2.0, 4, false),
            reflector(35, "Iridium Neutron Reflector", 1.0),
        ];

        Self {
            ruleset,
            components,
        }
    }

    pub fn ruleset(&self) -> Ruleset {
        self.ruleset
    }

    /// Known ids in catalog order.
    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.components.iter().map(|c| c.id())
    }

    /// Ids of every fuel-bearing component.
    pub fn fuel_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.components
            .iter()
            .filter(|c| c.rod_count() > 0)
            .map(|c| c.id())
    }
}

impl ComponentFactory for Catalog {
    fn default_component(&self, id: i32) -> Option<&dyn ReactorComponent> {
        self.components
            .iter()
            .find(|c| c.id() == id)
            .map(|c| c.as_ref())
    }

    fn default_component_by_name(&self, name: &str) -> Option<&dyn ReactorComponent> {
        self.components
            .iter()
            .find(|c| c.name() == name || c.base_name() == name)
            .map(|c| c.as_ref())
    }

    fn count(&self) -> usize {
        self.components.len()
    }
}
