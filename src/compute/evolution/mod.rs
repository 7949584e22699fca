//! Evolutionary search for reactor layouts.
//!
//! # Overview
//!
//! - **Genome Operations** (`genome`): random generation, crossover,
//!   mutation, similarity and grid conversion
//! - **Fitness** (`fitness`): simulate a candidate and reduce the result to a score
//! - **Species** (`species`): greedy clustering and deduplicated reporting
//! - **Search** (`search`): the generational control loop
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use reactor_planner::compute::Catalog;
//! use reactor_planner::compute::evolution::{EvolutionEngine, top_distinct};
//! use reactor_planner::schema::GaConfig;
//!
//! let config = GaConfig::default();
//! let mut engine = EvolutionEngine::new(config.clone(), Arc::new(Catalog::default()))?;
//! let population = engine.run_with_callback(|summary| {
//!     println!(
//!         "Generation {}: alpha fitness = {:.3}",
//!         summary.generation, summary.alpha_fitness
//!     );
//! })?;
//!
//! for best in top_distinct(&population, &config.speciation, 3) {
//!     println!("{:.3} {}", best.fitness, best.genome);
//! }
//! # Ok::<(), reactor_planner::compute::evolution::EvolutionError>(())
//! ```

mod fitness;
mod genome;
mod search;
mod species;

pub use fitness::{EvaluatedGenome, FitnessEvaluator, score};
pub use genome::{Dice, GenomeRng, genome_similarity};
pub use search::{EvolutionEngine, EvolutionError};
pub use species::{Species, speciate, top_distinct};
