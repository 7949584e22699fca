//! Compact text codes for reactor layouts.
//!
//! The reference [`HexBlueprint`] format is two hex digits per cell in
//! row-major order (`00` for an empty cell), each optionally followed by a
//! tuning suffix such as `(h40,a9000,p20)`, then optional `|`-separated
//! setting flags:
//!
//! | flag | meaning |
//! |------|---------|
//! | `f` | fluid (heat-unit) output |
//! | `p<on>:<off>:<suspend>:<resume>` | pulsed operation |
//! | `a` | automated replacement |
//! | `i` | coolant injectors |
//! | `h<heat>` | starting hull heat |

use crate::schema::{ReactorConfig, ReactorSettings};

use super::component::{ComponentFactory, FactoryError, Placement, Tuning};
use super::reactor::Reactor;

/// Blueprint decoding and encoding errors.
#[derive(Debug, thiserror::Error)]
pub enum BlueprintError {
    #[error("Blueprint has {actual} cells, expected {expected}")]
    WrongCellCount { expected: usize, actual: usize },
    #[error("Invalid cell code {text:?} at cell {cell}")]
    InvalidCell { cell: usize, text: String },
    #[error("Invalid tuning {text:?} at cell {cell}")]
    InvalidTuning { cell: usize, text: String },
    #[error("Invalid setting flag {0:?}")]
    InvalidSetting(String),
    #[error("Component id {0} cannot be written as two hex digits")]
    IdOutOfRange(i32),
    #[error("Blueprint is {rows}x{cols}, codec expects {expected_rows}x{expected_cols}")]
    DimensionMismatch {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
    #[error(transparent)]
    Factory(#[from] FactoryError),
}

/// Reactor to text and back.
pub trait BlueprintCodec {
    fn encode(&self, reactor: &Reactor) -> Result<String, BlueprintError>;

    fn decode(
        &self,
        code: &str,
        factory: &dyn ComponentFactory,
    ) -> Result<Reactor, BlueprintError>;
}

/// Reference hex codec for a fixed grid size.
///
/// A code carries every mode flag, pulse timing and starting heat, so
/// decoding starts those from their defaults. Only the tick cap, which a
/// code cannot express, comes from `base`.
#[derive(Debug, Clone)]
pub struct HexBlueprint {
    rows: usize,
    cols: usize,
    base: ReactorSettings,
}

impl Default for HexBlueprint {
    fn default() -> Self {
        Self::from_config(&ReactorConfig::default())
    }
}

impl HexBlueprint {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            base: ReactorSettings::default(),
        }
    }

    pub fn from_config(config: &ReactorConfig) -> Self {
        Self {
            rows: config.rows,
            cols: config.cols,
            base: config.settings.clone(),
        }
    }

    fn parse_tuning(cell: usize, text: &str) -> Result<Tuning, BlueprintError> {
        let invalid = || BlueprintError::InvalidTuning {
            cell,
            text: text.to_string(),
        };
        let mut tuning = Tuning::default();
        for field in text.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            let mut chars = field.chars();
            let key = chars.next();
            let value = chars.as_str();
            match key {
                Some('h') => tuning.initial_heat = value.parse().map_err(|_| invalid())?,
                Some('a') => tuning.automation_threshold = value.parse().map_err(|_| invalid())?,
                Some('p') => tuning.reactor_pause = value.parse().map_err(|_| invalid())?,
                _ => return Err(invalid()),
            }
        }
        Ok(tuning)
    }

    fn parse_grid(&self, grid: &str) -> Result<Vec<(u8, Tuning)>, BlueprintError> {
        let mut cells = Vec::with_capacity(self.rows * self.cols);
        let mut rest = grid;
        while !rest.is_empty() {
            let cell = cells.len();
            let digits = rest.get(..2).ok_or_else(|| BlueprintError::InvalidCell {
                cell,
                text: rest.to_string(),
            })?;
            let id = u8::from_str_radix(digits, 16).map_err(|_| BlueprintError::InvalidCell {
                cell,
                text: digits.to_string(),
            })?;
            rest = &rest[2..];

            let mut tuning = Tuning::default();
            if let Some(inner) = rest.strip_prefix('(') {
                let close = inner.find(')').ok_or_else(|| BlueprintError::InvalidTuning {
                    cell,
                    text: inner.to_string(),
                })?;
                tuning = Self::parse_tuning(cell, &inner[..close])?;
                rest = &inner[close + 1..];
            }
            cells.push((id, tuning));
        }
        Ok(cells)
    }

    fn apply_flag(settings: &mut ReactorSettings, flag: &str) -> Result<(), BlueprintError> {
        let invalid = || BlueprintError::InvalidSetting(flag.to_string());
        let mut chars = flag.chars();
        let key = chars.next();
        match (key, chars.as_str()) {
            (Some('f'), "") => settings.fluid = true,
            (Some('a'), "") => settings.automated = true,
            (Some('i'), "") => settings.coolant_injectors = true,
            (Some('h'), heat) => settings.starting_heat = heat.parse().map_err(|_| invalid())?,
            (Some('p'), timing) => {
                let parts: Vec<&str> = timing.split(':').collect();
                let [on, off, suspend, resume] = parts.as_slice() else {
                    return Err(invalid());
                };
                settings.pulsed = true;
                settings.on_pulse = on.parse().map_err(|_| invalid())?;
                settings.off_pulse = off.parse().map_err(|_| invalid())?;
                settings.suspend_temp = suspend.parse().map_err(|_| invalid())?;
                settings.resume_temp = resume.parse().map_err(|_| invalid())?;
            }
            _ => return Err(invalid()),
        }
        Ok(())
    }
}

impl BlueprintCodec for HexBlueprint {
    fn encode(&self, reactor: &Reactor) -> Result<String, BlueprintError> {
        if reactor.rows() != self.rows || reactor.cols() != self.cols {
            return Err(BlueprintError::DimensionMismatch {
                rows: reactor.rows(),
                cols: reactor.cols(),
                expected_rows: self.rows,
                expected_cols: self.cols,
            });
        }

        let mut code = String::with_capacity(reactor.cell_count() * 2);
        for index in 0..reactor.cell_count() {
            let Some(placement) = reactor.placement(index) else {
                code.push_str("00");
                continue;
            };
            let id = placement.component.id();
            if !(1..=0xFF).contains(&id) {
                return Err(BlueprintError::IdOutOfRange(id));
            }
            code.push_str(&format!("{id:02X}"));
            let tuning = placement.tuning;
            if tuning != Tuning::default() {
                code.push_str(&format!(
                    "(h{},a{},p{})",
                    tuning.initial_heat, tuning.automation_threshold, tuning.reactor_pause
                ));
            }
        }

        let settings = reactor.settings();
        if settings.fluid {
            code.push_str("|f");
        }
        if settings.pulsed {
            code.push_str(&format!(
                "|p{}:{}:{}:{}",
                settings.on_pulse, settings.off_pulse, settings.suspend_temp, settings.resume_temp
            ));
        }
        if settings.automated {
            code.push_str("|a");
        }
        if settings.coolant_injectors {
            code.push_str("|i");
        }
        if settings.starting_heat > 0.0 {
            code.push_str(&format!("|h{}", settings.starting_heat));
        }
        Ok(code)
    }

    fn decode(
        &self,
        code: &str,
        factory: &dyn ComponentFactory,
    ) -> Result<Reactor, BlueprintError> {
        let mut sections = code.trim().split('|');
        let grid = sections.next().unwrap_or_default();
        let cells = self.parse_grid(grid)?;
        let expected = self.rows * self.cols;
        if cells.len() != expected {
            return Err(BlueprintError::WrongCellCount {
                expected,
                actual: cells.len(),
            });
        }

        let mut reactor = Reactor::new(self.rows, self.cols);
        let mut settings = ReactorSettings {
            max_simulation_ticks: self.base.max_simulation_ticks,
            ..ReactorSettings::default()
        };
        for flag in sections.map(str::trim).filter(|f| !f.is_empty()) {
            Self::apply_flag(&mut settings, flag)?;
        }
        *reactor.settings_mut() = settings;

        for (index, (id, tuning)) in cells.into_iter().enumerate() {
            if id == 0 {
                continue;
            }
            let component = factory.create(i32::from(id))?;
            let (row, col) = reactor.position(index);
            reactor.set(row, col, Some(Placement::new(component).with_tuning(tuning)));
        }
        Ok(reactor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Catalog;
    use proptest::prelude::*;

    fn empty_cells(n: usize) -> String {
        "00".repeat(n)
    }

    #[test]
    fn test_decode_places_components() {
        let catalog = Catalog::default();
        let code = format!("0309{}", empty_cells(52));
        let reactor = HexBlueprint::default().decode(&code, &catalog).unwrap();

        assert_eq!(reactor.component_at(0, 0).unwrap().name(), "Quad Uranium Cell");
        assert_eq!(reactor.component_at(0, 1).unwrap().name(), "Heat Vent");
        assert_eq!(reactor.occupied(), vec![0, 1]);
    }

    #[test]
    fn test_tuning_and_flags() {
        let catalog = Catalog::default();
        let code = format!(
            "01(h40,a120,p20)0a{}|f|p5:5:8000:1000|a|i|h250",
            empty_cells(52)
        );
        let reactor = HexBlueprint::default().decode(&code, &catalog).unwrap();

        let placement = reactor.placement(0).unwrap();
        assert_eq!(placement.tuning.initial_heat, 40.0);
        assert_eq!(placement.tuning.automation_threshold, 120.0);
        assert_eq!(placement.tuning.reactor_pause, 20);
        assert_eq!(reactor.component_at(0, 1).unwrap().id(), 10);

        let settings = reactor.settings();
        assert!(settings.fluid && settings.pulsed && settings.automated);
        assert!(settings.coolant_injectors);
        assert_eq!((settings.on_pulse, settings.off_pulse), (5, 5));
        assert_eq!(settings.suspend_temp, 8_000.0);
        assert_eq!(settings.resume_temp, 1_000.0);
        assert_eq!(settings.starting_heat, 250.0);

        let codec = HexBlueprint::default();
        let encoded = codec.encode(&reactor).unwrap();
        assert_eq!(
            encoded,
            format!("01(h40,a120,p20)0A{}|f|p5:5:8000:1000|a|i|h250", empty_cells(52))
        );
    }

    #[test]
    fn test_partial_tuning_keeps_defaults() {
        let catalog = Catalog::default();
        let code = format!("0E(h15){}", empty_cells(53));
        let reactor = HexBlueprint::default().decode(&code, &catalog).unwrap();
        let tuning = reactor.placement(0).unwrap().tuning;
        assert_eq!(tuning.initial_heat, 15.0);
        assert_eq!(tuning.automation_threshold, Tuning::default().automation_threshold);
    }

    #[test]
    fn test_errors() {
        let catalog = Catalog::default();
        let codec = HexBlueprint::default();

        assert!(matches!(
            codec.decode("0309", &catalog),
            Err(BlueprintError::WrongCellCount {
                expected: 54,
                actual: 2
            })
        ));
        assert!(matches!(
            codec.decode(&format!("zz{}", empty_cells(53)), &catalog),
            Err(BlueprintError::InvalidCell { cell: 0, .. })
        ));
        assert!(matches!(
            codec.decode(&format!("01(x3){}", empty_cells(53)), &catalog),
            Err(BlueprintError::InvalidTuning { cell: 0, .. })
        ));
        assert!(matches!(
            codec.decode(&format!("{}|q", empty_cells(54)), &catalog),
            Err(BlueprintError::InvalidSetting(_))
        ));
        assert!(matches!(
            codec.decode(&format!("FF{}", empty_cells(53)), &catalog),
            Err(BlueprintError::Factory(FactoryError::UnknownId(255)))
        ));
        assert!(matches!(
            codec.encode(&Reactor::new(3, 3)),
            Err(BlueprintError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_base_settings_apply() {
        let catalog = Catalog::default();
        let mut config = ReactorConfig::default();
        config.settings.max_simulation_ticks = 1_000;
        let reactor = HexBlueprint::from_config(&config)
            .decode(&empty_cells(54), &catalog)
            .unwrap();
        assert_eq!(reactor.settings().max_simulation_ticks, 1_000);
    }

    #[test]
    fn test_flags_off_survive_a_flagged_base() {
        let catalog = Catalog::default();
        let mut config = ReactorConfig::default();
        config.settings.fluid = true;
        config.settings.automated = true;
        config.settings.pulsed = true;
        config.settings.starting_heat = 500.0;
        let codec = HexBlueprint::from_config(&config);

        let mut reactor = Reactor::new(6, 9);
        reactor.place(0, 0, catalog.create(1).unwrap());
        let code = codec.encode(&reactor).unwrap();
        assert_eq!(code, format!("01{}", empty_cells(53)));

        let decoded = codec.decode(&code, &catalog).unwrap();
        assert_eq!(decoded.settings(), reactor.settings());
        assert_eq!(codec.encode(&decoded).unwrap(), code);
    }

    proptest! {
        #[test]
        fn test_encode_is_stable(cells in proptest::collection::vec(0usize..30, 54)) {
            let catalog = Catalog::default();
            let ids: Vec<i32> = catalog.ids().collect();
            let codec = HexBlueprint::default();
            let mut reactor = Reactor::new(6, 9);
            for (index, &pick) in cells.iter().enumerate() {
                if let Some(&id) = ids.get(pick) {
                    let (row, col) = reactor.position(index);
                    reactor.place(row, col, catalog.create(id).unwrap());
                }
            }
            let code = codec.encode(&reactor).unwrap();
            let decoded = codec.decode(&code, &catalog).unwrap();
            prop_assert_eq!(codec.encode(&decoded).unwrap(), code);
        }
    }
}
