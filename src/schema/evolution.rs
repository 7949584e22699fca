//! Evolution configuration types for automated reactor layout search.
//!
//! This module provides the genetic-algorithm configuration document, the
//! genome representation of a candidate reactor, and the progress types
//! reported while a search is running.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::compute::{ComponentFactory, FactoryError};

use super::{ConfigError, ReactorConfig, strip_json_comments};

/// Gene marking an empty grid cell.
pub const EMPTY_GENE: i32 = -1;

/// Gene marking a cell that holds the genome's fuel type.
pub const FUEL_GENE: i32 = 999;

/// Top-level configuration for the evolutionary layout search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaConfig {
    /// Grid dimensions and operating settings of every candidate.
    #[serde(default)]
    pub reactor: ReactorConfig,
    /// Component ids a cell may hold (may include `EMPTY_GENE` and `FUEL_GENE`).
    pub components: IdPool,
    /// Fuel component ids a genome may choose from.
    pub fuels: IdPool,
    /// Population and generation settings.
    #[serde(default)]
    pub evolution: EvolutionParams,
    /// Per-phase mutation probabilities.
    #[serde(default)]
    pub mutation: MutationConfig,
    /// Species clustering parameters.
    #[serde(default)]
    pub speciation: SpeciationConfig,
    /// Fitness weights.
    #[serde(default)]
    pub fitness: FitnessConfig,
}

impl Default for GaConfig {
    fn default() -> Self {
        let mut components = vec![EMPTY_GENE, FUEL_GENE, 7, 8];
        components.extend(9..=25);
        Self {
            reactor: ReactorConfig::default(),
            components: IdPool { valid: components },
            fuels: IdPool {
                valid: vec![1, 2, 3, 4, 5, 6],
            },
            evolution: EvolutionParams::default(),
            mutation: MutationConfig::default(),
            speciation: SpeciationConfig::default(),
            fitness: FitnessConfig::default(),
        }
    }
}

/// A list of allowed ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdPool {
    pub valid: Vec<i32>,
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionParams {
    /// Number of genomes per generation.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Number of generations to run.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Generations between exploration/refinement phase flips.
    #[serde(default = "default_phase_length")]
    pub phase_length: usize,
    /// Top genomes carried over unchanged.
    #[serde(default = "default_elite_count")]
    pub elite_count: usize,
    /// Samples drawn per tournament.
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
    /// Species-per-genome ratio below which random genomes are injected.
    #[serde(default = "default_low_diversity_threshold")]
    pub low_diversity_threshold: f64,
    /// Fraction of the population replaced by random genomes on low diversity.
    #[serde(default = "default_low_diversity_culling_ratio")]
    pub low_diversity_culling_ratio: f64,
    /// Optional file of blueprint codes injected into generation zero.
    #[serde(default)]
    pub seed_file: Option<String>,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Evaluation worker count (defaults to available parallelism).
    #[serde(default)]
    pub evaluation_workers: Option<usize>,
}

impl Default for EvolutionParams {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            max_generations: default_max_generations(),
            phase_length: default_phase_length(),
            elite_count: default_elite_count(),
            tournament_size: default_tournament_size(),
            low_diversity_threshold: default_low_diversity_threshold(),
            low_diversity_culling_ratio: default_low_diversity_culling_ratio(),
            seed_file: None,
            random_seed: None,
            evaluation_workers: None,
        }
    }
}

fn default_population_size() -> usize {
    200
}
fn default_max_generations() -> usize {
    100
}
fn default_phase_length() -> usize {
    10
}
fn default_elite_count() -> usize {
    4
}
fn default_tournament_size() -> usize {
    4
}
fn default_low_diversity_threshold() -> f64 {
    0.1
}
fn default_low_diversity_culling_ratio() -> f64 {
    0.2
}

/// Mutation probabilities for both search phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationConfig {
    #[serde(default = "MutationProbabilities::exploration")]
    pub exploration: MutationProbabilities,
    #[serde(default = "MutationProbabilities::refinement")]
    pub refinement: MutationProbabilities,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            exploration: MutationProbabilities::exploration(),
            refinement: MutationProbabilities::refinement(),
        }
    }
}

impl MutationConfig {
    /// Probability profile for the given phase.
    pub fn for_phase(&self, phase: EvolutionPhase) -> &MutationProbabilities {
        match phase {
            EvolutionPhase::Exploration => &self.exploration,
            EvolutionPhase::Refinement => &self.refinement,
        }
    }
}

/// Probabilities of the three mutation channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MutationProbabilities {
    /// Re-roll the genome's fuel type.
    pub fuel: f64,
    /// Re-roll one random cell.
    pub layout: f64,
    /// Re-roll each cell independently.
    pub layout_per_slot: f64,
}

impl MutationProbabilities {
    fn exploration() -> Self {
        Self {
            fuel: 0.1,
            layout: 0.8,
            layout_per_slot: 0.05,
        }
    }

    fn refinement() -> Self {
        Self {
            fuel: 0.02,
            layout: 0.5,
            layout_per_slot: 0.01,
        }
    }
}

/// Species clustering parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciationConfig {
    /// Similarity at or above which a genome joins an existing species.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Weight of fuel-placement overlap in the similarity score.
    #[serde(default = "default_layout_weight")]
    pub fuel_layout_weight: f64,
    /// Weight of non-fuel cell agreement in the similarity score. The two
    /// weights must sum to 1.
    #[serde(default = "default_layout_weight")]
    pub components_layout_weight: f64,
}

impl Default for SpeciationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            fuel_layout_weight: default_layout_weight(),
            components_layout_weight: default_layout_weight(),
        }
    }
}

fn default_similarity_threshold() -> f64 {
    0.8
}
fn default_layout_weight() -> f64 {
    0.5
}

/// Fitness weights and penalties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessConfig {
    /// Weight of average output.
    #[serde(default = "default_output_weight")]
    pub output_weight: f64,
    /// Weight of the efficiency bonus.
    #[serde(default = "default_efficiency_weight")]
    pub efficiency_weight: f64,
    /// Output per fuel cell that earns the full efficiency bonus.
    #[serde(default = "default_target_efficiency")]
    pub target_efficiency: f64,
    /// Multiplier applied when any component broke during the run.
    #[serde(default = "default_broken_penalty")]
    pub broken_penalty: f64,
    /// Fitness subtracted per unit of peak hull heat.
    #[serde(default = "default_heat_penalty_weight")]
    pub heat_penalty_weight: f64,
    /// Peak hull heat above which fitness is forced to zero.
    #[serde(default = "default_heat_ceiling")]
    pub heat_ceiling: f64,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            output_weight: default_output_weight(),
            efficiency_weight: default_efficiency_weight(),
            target_efficiency: default_target_efficiency(),
            broken_penalty: default_broken_penalty(),
            heat_penalty_weight: default_heat_penalty_weight(),
            heat_ceiling: default_heat_ceiling(),
        }
    }
}

fn default_output_weight() -> f64 {
    1.0
}
fn default_efficiency_weight() -> f64 {
    0.5
}
fn default_target_efficiency() -> f64 {
    5.0
}
fn default_broken_penalty() -> f64 {
    0.5
}
fn default_heat_penalty_weight() -> f64 {
    0.001
}
fn default_heat_ceiling() -> f64 {
    5_000.0
}

impl GaConfig {
    /// Parse a configuration document, ignoring `//` and `/* */` comments.
    pub fn from_json_str(json: &str) -> Result<Self, EvolutionConfigError> {
        let config: Self = serde_json::from_str(&strip_json_comments(json))?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EvolutionConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Number of genes per genome.
    #[inline]
    pub fn genome_len(&self) -> usize {
        self.reactor.cell_count()
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.reactor.validate()?;

        if self.components.valid.is_empty() {
            return Err(EvolutionConfigError::EmptyComponentPool);
        }
        if self.fuels.valid.is_empty() {
            return Err(EvolutionConfigError::EmptyFuelPool);
        }
        if let Some(&id) = self
            .fuels
            .valid
            .iter()
            .find(|&&id| id == FUEL_GENE || id == EMPTY_GENE)
        {
            return Err(EvolutionConfigError::SentinelCollision(id));
        }

        let evolution = &self.evolution;
        if evolution.population_size < 2 {
            return Err(EvolutionConfigError::InvalidPopulationSize);
        }
        if evolution.elite_count > evolution.population_size {
            return Err(EvolutionConfigError::InvalidEliteCount {
                elite: evolution.elite_count,
                population: evolution.population_size,
            });
        }
        if evolution.tournament_size == 0 {
            return Err(EvolutionConfigError::InvalidTournamentSize);
        }
        if evolution.phase_length == 0 {
            return Err(EvolutionConfigError::InvalidPhaseLength);
        }
        if evolution.evaluation_workers == Some(0) {
            return Err(EvolutionConfigError::InvalidWorkerCount);
        }
        check_unit("low_diversity_threshold", evolution.low_diversity_threshold)?;
        check_unit(
            "low_diversity_culling_ratio",
            evolution.low_diversity_culling_ratio,
        )?;

        for probabilities in [&self.mutation.exploration, &self.mutation.refinement] {
            check_unit("fuel", probabilities.fuel)?;
            check_unit("layout", probabilities.layout)?;
            check_unit("layout_per_slot", probabilities.layout_per_slot)?;
        }

        check_unit(
            "similarity_threshold",
            self.speciation.similarity_threshold,
        )?;
        check_weight("fuel_layout_weight", self.speciation.fuel_layout_weight)?;
        check_weight(
            "components_layout_weight",
            self.speciation.components_layout_weight,
        )?;
        let blend =
            self.speciation.fuel_layout_weight + self.speciation.components_layout_weight;
        if (blend - 1.0).abs() > 1e-9 {
            return Err(EvolutionConfigError::UnbalancedSimilarityWeights(blend));
        }

        let fitness = &self.fitness;
        check_weight("output_weight", fitness.output_weight)?;
        check_weight("efficiency_weight", fitness.efficiency_weight)?;
        check_weight("broken_penalty", fitness.broken_penalty)?;
        check_weight("heat_penalty_weight", fitness.heat_penalty_weight)?;
        check_weight("heat_ceiling", fitness.heat_ceiling)?;
        if fitness.target_efficiency <= 0.0 || !fitness.target_efficiency.is_finite() {
            return Err(EvolutionConfigError::InvalidWeight {
                name: "target_efficiency",
                value: fitness.target_efficiency,
            });
        }

        Ok(())
    }

    /// Check every configured id against a component factory.
    pub fn validate_against(
        &self,
        factory: &dyn ComponentFactory,
    ) -> Result<(), EvolutionConfigError> {
        for sentinel in [EMPTY_GENE, FUEL_GENE] {
            if factory.default_component(sentinel).is_some() {
                return Err(EvolutionConfigError::SentinelCollision(sentinel));
            }
        }

        for &id in &self.components.valid {
            if id == EMPTY_GENE || id == FUEL_GENE {
                continue;
            }
            match factory.default_component(id) {
                None => return Err(EvolutionConfigError::UnknownComponent(id)),
                Some(component) if component.rod_count() > 0 => {
                    return Err(EvolutionConfigError::FuelInComponentPool(id));
                }
                Some(_) => {}
            }
        }

        for &id in &self.fuels.valid {
            match factory.default_component(id) {
                None => return Err(EvolutionConfigError::UnknownComponent(id)),
                Some(component) if component.rod_count() == 0 => {
                    return Err(EvolutionConfigError::NotAFuel(id));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), EvolutionConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EvolutionConfigError::InvalidProbability { name, value })
    }
}

fn check_weight(name: &'static str, value: f64) -> Result<(), EvolutionConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EvolutionConfigError::InvalidWeight { name, value })
    }
}

/// A candidate reactor: a fuel choice plus one gene per grid cell.
///
/// Cells equal to [`FUEL_GENE`] hold `fuel_type`; cells equal to
/// [`EMPTY_GENE`] are empty; anything else is a component id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReactorGenome {
    /// Component id placed at every fuel cell.
    pub fuel_type: i32,
    /// Row-major genes, one per grid cell.
    pub layout: Vec<i32>,
}

impl ReactorGenome {
    /// Number of cells holding fuel.
    pub fn fuel_cell_count(&self) -> usize {
        self.layout.iter().filter(|&&gene| gene == FUEL_GENE).count()
    }

    /// Ids this genome places on the grid, fuel sentinel resolved.
    pub fn placed_ids(&self) -> HashSet<i32> {
        self.layout
            .iter()
            .filter(|&&gene| gene != EMPTY_GENE)
            .map(|&gene| if gene == FUEL_GENE { self.fuel_type } else { gene })
            .collect()
    }
}

impl fmt::Display for ReactorGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|", self.fuel_type)?;
        for (i, gene) in self.layout.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{gene}")?;
        }
        Ok(())
    }
}

impl FromStr for ReactorGenome {
    type Err = GenomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (fuel, layout) = s
            .trim()
            .split_once('|')
            .ok_or_else(|| GenomeError::Malformed(s.to_string()))?;
        let fuel_type = fuel
            .trim()
            .parse()
            .map_err(|_| GenomeError::Malformed(s.to_string()))?;
        let layout = if layout.trim().is_empty() {
            Vec::new()
        } else {
            layout
                .split(',')
                .map(|gene| gene.trim().parse::<i32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| GenomeError::Malformed(s.to_string()))?
        };
        Ok(Self { fuel_type, layout })
    }
}

/// Genome decoding and conversion errors.
#[derive(Debug, thiserror::Error)]
pub enum GenomeError {
    #[error("Malformed genome text: {0}")]
    Malformed(String),
    #[error("Genome has {actual} genes, expected {expected}")]
    WrongLength { expected: usize, actual: usize },
    #[error("Reactor is {rows}x{cols}, configuration expects {expected_rows}x{expected_cols}")]
    DimensionMismatch {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
    #[error("Component lookup failed: {0}")]
    Factory(#[from] FactoryError),
}

/// Search phase selecting the mutation profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvolutionPhase {
    /// Broad search with higher mutation rates.
    Exploration,
    /// Local search with lower mutation rates.
    Refinement,
}

impl EvolutionPhase {
    /// The other phase.
    pub fn flipped(self) -> Self {
        match self {
            Self::Exploration => Self::Refinement,
            Self::Refinement => Self::Exploration,
        }
    }
}

/// Counters for applied mutations, one per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationStats {
    /// Genomes passed through mutation.
    pub attempts: u64,
    /// Fuel re-rolls.
    pub fuel: u64,
    /// Single-cell re-rolls.
    pub single_cell: u64,
    /// Cells re-rolled by the per-slot sweep.
    pub per_slot: u64,
}

impl MutationStats {
    /// Total applied mutations across all channels.
    pub fn total(&self) -> u64 {
        self.fuel + self.single_cell + self.per_slot
    }
}

/// Per-generation progress summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSummary {
    /// Generation index (0-based).
    pub generation: usize,
    /// Total generations configured.
    pub total_generations: usize,
    /// Phase used to breed the next generation.
    pub phase: EvolutionPhase,
    /// Fitness of the generation's alpha.
    pub alpha_fitness: f64,
    /// Text encoding of the alpha genome.
    pub alpha_genome: String,
    /// Blueprint code of the alpha reactor.
    pub alpha_blueprint: String,
    /// Best fitness seen across all generations so far.
    pub best_fitness: f64,
    /// Mean fitness of the generation.
    pub avg_fitness: f64,
    /// Sum of all fitness values.
    pub total_fitness: f64,
    /// Genomes with positive fitness.
    pub stable_count: usize,
    /// Number of species found.
    pub species_count: usize,
    /// Species count divided by population size.
    pub diversity: f64,
    /// Random genomes reserved for the next generation.
    pub injected_random: usize,
    /// Mutations applied while breeding this generation's offspring.
    pub mutations: MutationStats,
    /// Wall-clock seconds spent on the generation.
    pub elapsed_seconds: f64,
}

/// Why the evolution stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Reached the configured generation count.
    MaxGenerations,
    /// Cancelled between generations.
    Cancelled,
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 2")]
    InvalidPopulationSize,
    #[error("Elite count {elite} exceeds population size {population}")]
    InvalidEliteCount { elite: usize, population: usize },
    #[error("Tournament size must be positive")]
    InvalidTournamentSize,
    #[error("Phase length must be positive")]
    InvalidPhaseLength,
    #[error("Evaluation worker count must be positive")]
    InvalidWorkerCount,
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("{name} must be a finite non-negative number, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("Component pool is empty")]
    EmptyComponentPool,
    #[error("Fuel pool is empty")]
    EmptyFuelPool,
    #[error("Id {0} collides with a reserved gene value")]
    SentinelCollision(i32),
    #[error("Unknown component id {0}")]
    UnknownComponent(i32),
    #[error("Component id {0} is not a fuel")]
    NotAFuel(i32),
    #[error("Fuel id {0} belongs in the fuel pool; place fuel with the fuel gene")]
    FuelInComponentPool(i32),
    #[error("Similarity weights must sum to 1, got {0}")]
    UnbalancedSimilarityWeights(f64),
    #[error("Reactor config validation failed: {0}")]
    Reactor(#[from] ConfigError),
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GaConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_pools_rejected() {
        let mut config = GaConfig::default();
        config.components.valid.clear();
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::EmptyComponentPool)
        ));

        let mut config = GaConfig::default();
        config.fuels.valid.clear();
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::EmptyFuelPool)
        ));
    }

    #[test]
    fn test_fuel_sentinel_in_fuel_pool_rejected() {
        let mut config = GaConfig::default();
        config.fuels.valid.push(FUEL_GENE);
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::SentinelCollision(FUEL_GENE))
        ));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let mut config = GaConfig::default();
        config.reactor.cols = 0;
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::Reactor(ConfigError::InvalidDimensions))
        ));
    }

    #[test]
    fn test_elite_larger_than_population_rejected() {
        let mut config = GaConfig::default();
        config.evolution.population_size = 4;
        config.evolution.elite_count = 5;
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::InvalidEliteCount { .. })
        ));
    }

    #[test]
    fn test_probability_out_of_range_rejected() {
        let mut config = GaConfig::default();
        config.mutation.refinement.layout = 1.5;
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::InvalidProbability { name: "layout", .. })
        ));
    }

    #[test]
    fn test_similarity_weights_must_sum_to_one() {
        let mut config = GaConfig::default();
        config.speciation.fuel_layout_weight = 0.3;
        config.speciation.components_layout_weight = 0.3;
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::UnbalancedSimilarityWeights(_))
        ));

        config.speciation.fuel_layout_weight = 0.7;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_commented_config() {
        let json = r#"{
            // candidate pools
            "components": { "valid": [-1, 999, 9, 10] },
            "fuels": { "valid": [1, 2] }, /* two fuels */
            "evolution": { "population_size": 12, "random_seed": 7 }
        }"#;
        let config = GaConfig::from_json_str(json).unwrap();
        assert_eq!(config.evolution.population_size, 12);
        assert_eq!(config.evolution.random_seed, Some(7));
        assert_eq!(config.evolution.tournament_size, 4);
        assert_eq!(config.reactor.rows, 6);
        assert_eq!(config.fitness.heat_ceiling, 5_000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ga.json");
        std::fs::write(
            &path,
            r#"{"components": {"valid": [-1, 999]}, "fuels": {"valid": [3]}}"#,
        )
        .unwrap();
        let config = GaConfig::load(&path).unwrap();
        assert_eq!(config.fuels.valid, vec![3]);
    }

    #[test]
    fn test_missing_pools_is_parse_error() {
        assert!(matches!(
            GaConfig::from_json_str("{}"),
            Err(EvolutionConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_genome_text_round_trip() {
        let genome = ReactorGenome {
            fuel_type: 3,
            layout: vec![FUEL_GENE, EMPTY_GENE, 9, 10, FUEL_GENE],
        };
        let text = genome.to_string();
        assert_eq!(text, "3|999,-1,9,10,999");
        assert_eq!(text.parse::<ReactorGenome>().unwrap(), genome);
    }

    #[test]
    fn test_genome_text_rejects_garbage() {
        assert!("no separator".parse::<ReactorGenome>().is_err());
        assert!("x|1,2".parse::<ReactorGenome>().is_err());
        assert!("1|1,,2".parse::<ReactorGenome>().is_err());
    }

    #[test]
    fn test_fuel_cell_count() {
        let genome = ReactorGenome {
            fuel_type: 1,
            layout: vec![FUEL_GENE, 9, FUEL_GENE, EMPTY_GENE],
        };
        assert_eq!(genome.fuel_cell_count(), 2);
        assert_eq!(genome.placed_ids(), HashSet::from([1, 9]));
    }

    #[test]
    fn test_validate_against_catalog() {
        let catalog = crate::compute::Catalog::default();
        let mut config = GaConfig::default();
        assert!(config.validate_against(&catalog).is_ok());

        config.components.valid.push(77);
        assert!(matches!(
            config.validate_against(&catalog),
            Err(EvolutionConfigError::UnknownComponent(77))
        ));

        let mut config = GaConfig::default();
        config.fuels.valid.push(9);
        assert!(matches!(
            config.validate_against(&catalog),
            Err(EvolutionConfigError::NotAFuel(9))
        ));

        // Quad uranium as a layout gene would bypass the genome's fuel type.
        let mut config = GaConfig::default();
        config.components.valid.push(3);
        assert!(config.validate().is_ok());
        assert!(matches!(
            config.validate_against(&catalog),
            Err(EvolutionConfigError::FuelInComponentPool(3))
        ));
    }

    #[test]
    fn test_phase_flip() {
        assert_eq!(
            EvolutionPhase::Exploration.flipped(),
            EvolutionPhase::Refinement
        );
        assert_eq!(
            EvolutionPhase::Refinement.flipped(),
            EvolutionPhase::Exploration
        );
    }
}
