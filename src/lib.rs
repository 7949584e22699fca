//! Reactor Planner - Tick-based reactor simulation with evolutionary layout search.
//!
//! This crate simulates a grid of heat- and energy-producing reactor
//! components tick by tick until the reactor settles, runs dry or melts
//! down, and uses that simulation as the fitness function of a genetic
//! algorithm that breeds better layouts.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration documents, genomes and seed lists
//! - `compute`: Components, the reactor grid, the simulator, blueprint codes
//!   and the evolutionary search
//!
//! # Example
//!
//! ```rust,no_run
//! use reactor_planner::{
//!     compute::{BlueprintCodec, Catalog, HexBlueprint, ReactorSimulator},
//! };
//!
//! let catalog = Catalog::default();
//!
//! // A single uranium rod next to an advanced heat vent.
//! let code = format!("010A{}", "00".repeat(52));
//! let mut reactor = HexBlueprint::default().decode(&code, &catalog)?;
//!
//! let result = ReactorSimulator::new().run(&mut reactor, false);
//! println!(
//!     "{} ticks, {:.1} EU/t, peak hull heat {}",
//!     result.total_ticks,
//!     result.avg_output(),
//!     result.max_temp
//! );
//! # Ok::<(), reactor_planner::compute::BlueprintError>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{Catalog, Reactor, ReactorSimulator, SimulationResult};
pub use schema::{GaConfig, ReactorConfig, ReactorGenome};
