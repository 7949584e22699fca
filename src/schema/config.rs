//! Configuration types for reactor grids and their operating modes.

use serde::{Deserialize, Serialize};

/// Base hull heat capacity before plating bonuses.
pub const BASE_HULL_HEAT: f64 = 10_000.0;

fn default_rows() -> usize {
    6
}
fn default_cols() -> usize {
    9
}

/// Grid dimensions plus the operating settings applied to every reactor built from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactorConfig {
    /// Number of grid rows.
    #[serde(default = "default_rows")]
    pub rows: usize,
    /// Number of grid columns.
    #[serde(default = "default_cols")]
    pub cols: usize,
    /// Operating settings (modes, pulse timing, tick ceiling).
    #[serde(default)]
    pub settings: ReactorSettings,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            cols: default_cols(),
            settings: ReactorSettings::default(),
        }
    }
}

impl ReactorConfig {
    /// Total number of grid cells (rows * cols).
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        self.settings.validate()
    }
}

/// Operating mode and pulse timing of a reactor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactorSettings {
    /// Output heat units (vented heat) instead of EU.
    #[serde(default)]
    pub fluid: bool,
    /// Run on a duty cycle / temperature band.
    #[serde(default)]
    pub pulsed: bool,
    /// Replace components when they cross their automation threshold.
    #[serde(default)]
    pub automated: bool,
    /// Refill condensators automatically.
    #[serde(default)]
    pub coolant_injectors: bool,
    /// Ticks the reactor stays on per pulse period.
    #[serde(default = "default_on_pulse")]
    pub on_pulse: u32,
    /// Ticks the reactor stays off per pulse period.
    #[serde(default)]
    pub off_pulse: u32,
    /// Hull heat at or above which a pulsed reactor shuts off.
    #[serde(default = "default_suspend_temp")]
    pub suspend_temp: f64,
    /// Hull heat at or below which a pulsed reactor may restart.
    #[serde(default)]
    pub resume_temp: f64,
    /// Hard ceiling on simulated ticks.
    #[serde(default = "default_max_simulation_ticks")]
    pub max_simulation_ticks: u32,
    /// Hull heat injected at the start of a run.
    #[serde(default)]
    pub starting_heat: f64,
}

fn default_on_pulse() -> u32 {
    5_000_000
}
fn default_suspend_temp() -> f64 {
    120_000.0
}
fn default_max_simulation_ticks() -> u32 {
    5_000_000
}

impl Default for ReactorSettings {
    fn default() -> Self {
        Self {
            fluid: false,
            pulsed: false,
            automated: false,
            coolant_injectors: false,
            on_pulse: default_on_pulse(),
            off_pulse: 0,
            suspend_temp: default_suspend_temp(),
            resume_temp: 0.0,
            max_simulation_ticks: default_max_simulation_ticks(),
            starting_heat: 0.0,
        }
    }
}

impl ReactorSettings {
    /// Length of one pulse period in ticks.
    #[inline]
    pub fn pulse_period(&self) -> u32 {
        self.on_pulse.saturating_add(self.off_pulse)
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pulsed && self.pulse_period() == 0 {
            return Err(ConfigError::InvalidPulse);
        }
        if self.max_simulation_ticks == 0 {
            return Err(ConfigError::InvalidTickCeiling);
        }
        if !self.starting_heat.is_finite() || self.starting_heat < 0.0 {
            return Err(ConfigError::InvalidStartingHeat(self.starting_heat));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Grid dimensions (rows, cols) must be non-zero")]
    InvalidDimensions,
    #[error("Pulsed reactors need a non-zero pulse period")]
    InvalidPulse,
    #[error("Maximum simulation ticks must be non-zero")]
    InvalidTickCeiling,
    #[error("Starting heat must be a non-negative number, got {0}")]
    InvalidStartingHeat(f64),
}

/// Remove `//` line comments and `/* */` block comments from a JSON document.
///
/// String literals are left untouched, so URLs and paths inside values survive.
pub fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    if skipped == '\n' {
                        out.push('\n');
                    }
                    prev = skipped;
                }
            }
            _ => out.push(c),
        }
    }

    out
}
