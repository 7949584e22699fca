//! Fitness evaluation for candidate reactor layouts.
//!
//! A genome is built into a reactor, simulated once, and the resulting
//! [`SimulationResult`] is reduced to a single score.

use crate::compute::{ComponentFactory, ReactorSimulator, SimulationResult};
use crate::schema::{FitnessConfig, GaConfig, GenomeError, ReactorGenome};

/// A genome together with its simulation outcome and score.
#[derive(Debug, Clone)]
pub struct EvaluatedGenome {
    pub genome: ReactorGenome,
    pub result: SimulationResult,
    pub fitness: f64,
}

/// Score a simulated layout.
///
/// Layouts whose hull ever ran hotter than `heat_ceiling` score exactly 0.
/// Otherwise the average output is rewarded, with a bonus scaled by the
/// square root of output per fuel cell relative to `target_efficiency`.
pub fn score(config: &FitnessConfig, genome: &ReactorGenome, result: &SimulationResult) -> f64 {
    if result.max_temp > config.heat_ceiling {
        return 0.0;
    }

    let avg_output = result.avg_output();
    let fuel_cells = genome.fuel_cell_count();
    let efficiency = if fuel_cells > 0 {
        avg_output / fuel_cells as f64
    } else {
        0.0
    };

    let mut fitness = avg_output * config.output_weight;
    let normalized = (efficiency / config.target_efficiency).sqrt();
    fitness += avg_output * normalized * config.efficiency_weight;

    if result.first_broken.is_some() {
        fitness *= config.broken_penalty;
    }
    fitness - result.max_temp * config.heat_penalty_weight
}

/// Builds, simulates and scores genomes.
pub struct FitnessEvaluator<'a> {
    config: &'a GaConfig,
    factory: &'a dyn ComponentFactory,
}

impl<'a> FitnessEvaluator<'a> {
    pub fn new(config: &'a GaConfig, factory: &'a dyn ComponentFactory) -> Self {
        Self { config, factory }
    }

    /// Evaluate one genome on a simulator that has been reset.
    pub fn evaluate(
        &self,
        simulator: &mut ReactorSimulator,
        genome: ReactorGenome,
    ) -> Result<EvaluatedGenome, GenomeError> {
        let mut reactor = genome.to_reactor(self.config, self.factory)?;
        let result = simulator.run(&mut reactor, false);
        let fitness = score(&self.config.fitness, &genome, &result);
        Ok(EvaluatedGenome {
            genome,
            result,
            fitness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Catalog;
    use crate::schema::{EMPTY_GENE, FUEL_GENE};

    fn config_with_ticks(ticks: u32) -> GaConfig {
        let mut config = GaConfig::default();
        config.reactor.settings.max_simulation_ticks = ticks;
        config
    }

    fn genome(config: &GaConfig, fuel_type: i32, genes: &[(usize, i32)]) -> ReactorGenome {
        let mut layout = vec![EMPTY_GENE; config.genome_len()];
        for &(index, gene) in genes {
            layout[index] = gene;
        }
        ReactorGenome { fuel_type, layout }
    }

    #[test]
    fn test_overheated_layout_scores_zero() {
        let config = config_with_ticks(1_000);
        let catalog = Catalog::default();
        let evaluator = FitnessEvaluator::new(&config, &catalog);

        // A lone quad rod dumps all its heat into the hull.
        let quad = genome(&config, 3, &[(0, FUEL_GENE)]);
        let evaluated = evaluator
            .evaluate(&mut ReactorSimulator::new(), quad)
            .unwrap();
        assert!(evaluated.result.max_temp > config.fitness.heat_ceiling);
        assert_eq!(evaluated.fitness, 0.0);
    }

    #[test]
    fn test_stable_layout_score() {
        let config = config_with_ticks(1_000);
        let catalog = Catalog::default();
        let evaluator = FitnessEvaluator::new(&config, &catalog);

        // Single uranium rod cooled by an advanced heat vent: 5 EU/t, no heat.
        let stable = genome(&config, 1, &[(0, FUEL_GENE), (1, 10)]);
        let evaluated = evaluator
            .evaluate(&mut ReactorSimulator::new(), stable)
            .unwrap();

        let fitness = &config.fitness;
        let expected = 5.0 * fitness.output_weight
            + 5.0 * (5.0 / fitness.target_efficiency).sqrt() * fitness.efficiency_weight;
        assert_eq!(evaluated.result.max_temp, 0.0);
        assert!((evaluated.fitness - expected).abs() < 1e-9);
    }

    #[test]
    fn test_broken_component_penalty_and_heat_penalty() {
        let config = config_with_ticks(1_000);
        let catalog = Catalog::default();
        let mut simulator = ReactorSimulator::new();

        // A quad rod overwhelms a basic heat vent, which breaks and spills heat.
        let layout = genome(&config, 3, &[(0, FUEL_GENE), (1, 9)]);
        let mut reactor = layout.to_reactor(&config, &catalog).unwrap();
        let result = simulator.run(&mut reactor, false);
        assert!(result.first_broken.is_some());

        let mut lenient = config.fitness.clone();
        lenient.heat_ceiling = f64::MAX;
        let with_penalty = score(&lenient, &layout, &result);
        lenient.broken_penalty = 1.0;
        lenient.heat_penalty_weight = 0.0;
        let without_penalty = score(&lenient, &layout, &result);
        assert!(with_penalty < without_penalty);
    }

    #[test]
    fn test_missing_component_is_an_error() {
        let config = config_with_ticks(10);
        let catalog = Catalog::default();
        let evaluator = FitnessEvaluator::new(&config, &catalog);
        let bad = genome(&config, 1, &[(0, 500)]);
        assert!(matches!(
            evaluator.evaluate(&mut ReactorSimulator::new(), bad),
            Err(GenomeError::Factory(_))
        ));
    }
}
