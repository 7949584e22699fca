//! Generational search over reactor layouts.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use crate::compute::{BlueprintCodec, ComponentFactory, HexBlueprint, ReactorSimulator};
use crate::schema::{
    EvolutionConfigError, EvolutionPhase, GaConfig, GenerationSummary, GenomeError,
    MutationStats, ReactorGenome, SeedFileError, StopReason, load_seed_file,
};

use super::fitness::{EvaluatedGenome, FitnessEvaluator};
use super::genome::{Dice, GenomeRng};
use super::species::speciate;

/// Errors that abort a search.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] EvolutionConfigError),
    #[error("Failed to load seeds: {0}")]
    SeedFile(#[from] SeedFileError),
    #[error("Evaluation of genome {genome} failed: {message}")]
    Evaluation { genome: String, message: String },
    #[error("Invalid genome: {0}")]
    Genome(#[from] GenomeError),
    #[error("Failed to start evaluation workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Evolution engine that runs the layout search.
pub struct EvolutionEngine {
    config: GaConfig,
    factory: Arc<dyn ComponentFactory>,
    codec: HexBlueprint,
    rng: GenomeRng,
    pool: rayon::ThreadPool,
    seeds: Vec<ReactorGenome>,
    population: Vec<ReactorGenome>,
    generation: usize,
    phase: EvolutionPhase,
    best_fitness: f64,
    cancelled: Arc<AtomicBool>,
    stop_reason: Option<StopReason>,
}

impl EvolutionEngine {
    /// Create a new evolution engine.
    ///
    /// Validates the configuration against `factory`, loads the seed file
    /// if one is configured, and starts the evaluation workers.
    pub fn new(
        config: GaConfig,
        factory: Arc<dyn ComponentFactory>,
    ) -> Result<Self, EvolutionError> {
        config.validate()?;
        config.validate_against(factory.as_ref())?;

        let seeds = match &config.evolution.seed_file {
            Some(path) => load_seed_file(path, &config, factory.as_ref())?,
            None => Vec::new(),
        };

        let workers = config.evolution.evaluation_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("reactor-eval-{i}"))
            .build()?;

        let rng = match config.evolution.random_seed {
            Some(seed) => GenomeRng::new(seed),
            None => GenomeRng::random(),
        };
        let codec = HexBlueprint::from_config(&config.reactor);

        log::debug!(
            "evolution engine ready: {} workers, {} seeds",
            workers,
            seeds.len()
        );

        Ok(Self {
            config,
            factory,
            codec,
            rng,
            pool,
            seeds,
            population: Vec::new(),
            generation: 0,
            phase: EvolutionPhase::Exploration,
            best_fitness: f64::NEG_INFINITY,
            cancelled: Arc::new(AtomicBool::new(false)),
            stop_reason: None,
        })
    }

    /// Queue genomes for generation zero, ahead of any from the seed file.
    pub fn pre_seed(
        &mut self,
        genomes: impl IntoIterator<Item = ReactorGenome>,
    ) -> Result<(), EvolutionError> {
        let expected = self.config.genome_len();
        let mut checked = Vec::new();
        for genome in genomes {
            if genome.layout.len() != expected {
                return Err(GenomeError::WrongLength {
                    expected,
                    actual: genome.layout.len(),
                }
                .into());
            }
            checked.push(genome);
        }
        checked.append(&mut self.seeds);
        self.seeds = checked;
        Ok(())
    }

    /// Get cancellation handle. Cancellation is checked between generations.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn phase(&self) -> EvolutionPhase {
        self.phase
    }

    /// Best fitness seen so far.
    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    /// Genomes awaiting evaluation.
    pub fn population(&self) -> &[ReactorGenome] {
        &self.population
    }

    /// Why the last run stopped, once it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Build generation zero: seeds first, then random genomes.
    pub fn initialize(&mut self) {
        let size = self.config.evolution.population_size;
        self.population.clear();
        self.generation = 0;
        self.phase = EvolutionPhase::Exploration;
        self.best_fitness = f64::NEG_INFINITY;
        self.stop_reason = None;

        self.population.extend(self.seeds.iter().take(size).cloned());
        while self.population.len() < size {
            let genome = ReactorGenome::random(&self.config, &mut self.rng);
            self.population.push(genome);
        }
    }

    /// Simulate and score every genome of the current population.
    fn evaluate_population(&self) -> Result<Vec<EvaluatedGenome>, EvolutionError> {
        let evaluator = FitnessEvaluator::new(&self.config, self.factory.as_ref());
        let population = &self.population;

        self.pool.install(|| {
            population
                .par_iter()
                .map_init(ReactorSimulator::new, |simulator, genome| {
                    simulator.reset_state();
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        evaluator.evaluate(simulator, genome.clone())
                    }));
                    let message = match outcome {
                        Ok(Ok(evaluated)) => return Ok(evaluated),
                        Ok(Err(err)) => err.to_string(),
                        Err(payload) => panic_message(payload.as_ref()),
                    };
                    log::error!("evaluation failed for genome {genome}: {message}");
                    Err(EvolutionError::Evaluation {
                        genome: genome.to_string(),
                        message,
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
    }

    /// Pick a parent with a k-way tournament. Ties keep the earliest sample.
    fn select_index(&mut self, evaluated: &[EvaluatedGenome]) -> usize {
        let mut best = self.rng.pick(evaluated.len());
        for _ in 1..self.config.evolution.tournament_size {
            let candidate = self.rng.pick(evaluated.len());
            if evaluated[candidate].fitness > evaluated[best].fitness {
                best = candidate;
            }
        }
        best
    }

    /// Assemble the next population from an evaluated one.
    fn breed(&mut self, evaluated: &[EvaluatedGenome], injected: usize) -> MutationStats {
        let size = self.config.evolution.population_size;
        let elite_count = self.config.evolution.elite_count.min(evaluated.len());
        let mut stats = MutationStats::default();

        let mut ranked: Vec<&EvaluatedGenome> = evaluated.iter().collect();
        ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

        let mut next: Vec<ReactorGenome> = ranked
            .iter()
            .take(elite_count)
            .map(|e| e.genome.clone())
            .collect();

        let offspring = size.saturating_sub(elite_count + injected);
        let probabilities = *self.config.mutation.for_phase(self.phase);
        for _ in 0..offspring {
            let a = self.select_index(evaluated);
            let b = self.select_index(evaluated);
            let mut child = ReactorGenome::cross_breed(
                &evaluated[a].genome,
                &evaluated[b].genome,
                &mut self.rng,
            );
            child.try_mutation(&self.config, &probabilities, &mut self.rng, &mut stats);
            next.push(child);
        }

        while next.len() < size {
            next.push(ReactorGenome::random(&self.config, &mut self.rng));
        }

        self.population = next;
        stats
    }

    /// Evaluate the current generation, then breed the next one unless
    /// this is the last.
    fn step_generation(
        &mut self,
    ) -> Result<(Vec<EvaluatedGenome>, GenerationSummary), EvolutionError> {
        let start = Instant::now();
        let evolution = &self.config.evolution;
        let size = evolution.population_size;
        let is_last = self.generation + 1 >= evolution.max_generations;

        if self.generation > 0 && self.generation % evolution.phase_length == 0 {
            self.phase = self.phase.flipped();
            log::debug!("generation {}: switching to {:?}", self.generation, self.phase);
        }

        let evaluated = self.evaluate_population()?;

        let mut alpha = 0;
        for (i, e) in evaluated.iter().enumerate() {
            if e.fitness > evaluated[alpha].fitness {
                alpha = i;
            }
        }
        let alpha_fitness = evaluated[alpha].fitness;
        let total_fitness: f64 = evaluated.iter().map(|e| e.fitness).sum();
        let avg_fitness = total_fitness / evaluated.len() as f64;
        let stable_count = evaluated.iter().filter(|e| e.fitness > 0.0).count();
        if alpha_fitness > self.best_fitness {
            self.best_fitness = alpha_fitness;
        }

        let genomes: Vec<&ReactorGenome> = evaluated.iter().map(|e| &e.genome).collect();
        let species_count = speciate(&genomes, &self.config.speciation).len();
        let diversity = species_count as f64 / size as f64;

        let elite_count = evolution.elite_count;
        let injected_random = if diversity < evolution.low_diversity_threshold {
            let reserved = (size as f64 * evolution.low_diversity_culling_ratio).floor() as usize;
            reserved.min(size.saturating_sub(elite_count))
        } else {
            0
        };

        let mutations = if is_last {
            MutationStats::default()
        } else {
            self.breed(&evaluated, injected_random)
        };

        let alpha_genome = &evaluated[alpha].genome;
        let alpha_blueprint = alpha_genome
            .to_reactor(&self.config, self.factory.as_ref())
            .ok()
            .and_then(|reactor| self.codec.encode(&reactor).ok())
            .unwrap_or_default();

        let summary = GenerationSummary {
            generation: self.generation,
            total_generations: self.config.evolution.max_generations,
            phase: self.phase,
            alpha_fitness,
            alpha_genome: alpha_genome.to_string(),
            alpha_blueprint,
            best_fitness: self.best_fitness,
            avg_fitness,
            total_fitness,
            stable_count,
            species_count,
            diversity,
            injected_random,
            mutations,
            elapsed_seconds: start.elapsed().as_secs_f64(),
        };

        log::debug!(
            "generation {}: alpha {:.3} avg {:.3} stable {}/{} species {} ({:.3}) injected {}",
            summary.generation,
            summary.alpha_fitness,
            summary.avg_fitness,
            summary.stable_count,
            size,
            summary.species_count,
            summary.diversity,
            summary.injected_random,
        );
        log::debug!(
            "generation {}: mutations fuel {} cell {} per-slot {} over {} children",
            summary.generation,
            mutations.fuel,
            mutations.single_cell,
            mutations.per_slot,
            mutations.attempts,
        );

        self.generation += 1;
        Ok((evaluated, summary))
    }

    /// Check if evolution should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }
        if self.generation >= self.config.evolution.max_generations {
            return Some(StopReason::MaxGenerations);
        }
        None
    }

    /// Run every generation, reporting each one, and return the last
    /// evaluated population.
    pub fn run_with_callback<F>(
        &mut self,
        callback: F,
    ) -> Result<Vec<EvaluatedGenome>, EvolutionError>
    where
        F: Fn(&GenerationSummary),
    {
        self.initialize();

        let mut last = Vec::new();
        let reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }
            let (evaluated, summary) = self.step_generation()?;
            callback(&summary);
            last = evaluated;
        };

        log::info!(
            "evolution stopped after {} generations ({:?}), best fitness {:.3}",
            self.generation,
            reason,
            self.best_fitness
        );
        self.stop_reason = Some(reason);
        Ok(last)
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> Result<Vec<EvaluatedGenome>, EvolutionError> {
        self.run_with_callback(|_| {})
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "evaluation panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::compute::{Catalog, FactoryError, ReactorComponent};
    use crate::schema::{EMPTY_GENE, FUEL_GENE};

    /// Catalog whose instances of one id cannot be built.
    struct BrokenFactory {
        catalog: Catalog,
        broken: i32,
        panics: bool,
    }

    impl ComponentFactory for BrokenFactory {
        fn default_component(&self, id: i32) -> Option<&dyn ReactorComponent> {
            self.catalog.default_component(id)
        }

        fn default_component_by_name(&self, name: &str) -> Option<&dyn ReactorComponent> {
            self.catalog.default_component_by_name(name)
        }

        fn create(&self, id: i32) -> Result<Box<dyn ReactorComponent>, FactoryError> {
            if id == self.broken {
                if self.panics {
                    panic!("component {id} exploded");
                }
                return Err(FactoryError::UnknownId(id));
            }
            self.catalog.create(id)
        }

        fn count(&self) -> usize {
            self.catalog.count()
        }
    }

    fn small_config(population: usize, generations: usize) -> GaConfig {
        let mut config = GaConfig::default();
        config.reactor.settings.max_simulation_ticks = 2_000;
        config.evolution.population_size = population;
        config.evolution.max_generations = generations;
        config.evolution.elite_count = 2;
        config.evolution.phase_length = 2;
        config.evolution.random_seed = Some(42);
        config.evolution.evaluation_workers = Some(2);
        config
    }

    fn engine(config: GaConfig) -> EvolutionEngine {
        EvolutionEngine::new(config, Arc::new(Catalog::default())).unwrap()
    }

    #[test]
    fn test_evolution_engine_creation() {
        let mut engine = engine(small_config(10, 3));
        engine.initialize();
        assert_eq!(engine.population().len(), 10);
        assert!(engine.population().iter().all(|g| g.layout.len() == 54));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config(10, 3);
        config.components.valid.push(77);
        assert!(matches!(
            EvolutionEngine::new(config, Arc::new(Catalog::default())),
            Err(EvolutionError::Config(EvolutionConfigError::UnknownComponent(77)))
        ));
    }

    #[test]
    fn test_evolution_run() {
        let mut engine = engine(small_config(8, 3));
        let summaries = RefCell::new(Vec::new());
        let final_population = engine
            .run_with_callback(|s| summaries.borrow_mut().push(s.clone()))
            .unwrap();

        let summaries = summaries.into_inner();
        assert_eq!(summaries.len(), 3);
        assert_eq!(final_population.len(), 8);
        assert_eq!(engine.generation(), 3);
        assert_eq!(engine.stop_reason(), Some(StopReason::MaxGenerations));

        // Phase flips at generation 2.
        assert_eq!(summaries[0].phase, EvolutionPhase::Exploration);
        assert_eq!(summaries[2].phase, EvolutionPhase::Refinement);

        // Elites are re-simulated unchanged, so the alpha never regresses.
        for pair in summaries.windows(2) {
            assert!(pair[1].alpha_fitness >= pair[0].alpha_fitness);
        }
        // The final generation is not bred.
        assert_eq!(summaries[2].mutations, MutationStats::default());
        assert_eq!(summaries[0].mutations.attempts, 6 - summaries[0].injected_random as u64);
        assert!(!summaries[0].alpha_blueprint.is_empty());
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let trace = |config: GaConfig| {
            let mut engine = engine(config);
            let seen = RefCell::new(Vec::new());
            let last = engine
                .run_with_callback(|s| {
                    seen.borrow_mut()
                        .push((s.alpha_genome.clone(), s.alpha_fitness, s.alpha_blueprint.clone()))
                })
                .unwrap();
            let fitness: Vec<f64> = last.iter().map(|e| e.fitness).collect();
            (seen.into_inner(), fitness)
        };

        let mut threaded = small_config(10, 4);
        threaded.evolution.evaluation_workers = Some(4);
        assert_eq!(trace(small_config(10, 4)), trace(threaded));
    }

    #[test]
    fn test_cancellation() {
        let mut engine = engine(small_config(6, 100));
        let handle = engine.cancel_handle();
        let generations = RefCell::new(0);
        engine
            .run_with_callback(|s| {
                *generations.borrow_mut() += 1;
                if s.generation == 1 {
                    handle.store(true, Ordering::Relaxed);
                }
            })
            .unwrap();

        assert_eq!(*generations.borrow(), 2);
        assert_eq!(engine.stop_reason(), Some(StopReason::Cancelled));
    }

    #[test]
    fn test_pre_seeded_genomes_come_first() {
        let mut engine = engine(small_config(6, 1));
        let mut layout = vec![EMPTY_GENE; 54];
        layout[0] = FUEL_GENE;
        layout[1] = 10;
        let seed = ReactorGenome {
            fuel_type: 1,
            layout,
        };
        engine.pre_seed([seed.clone()]).unwrap();
        engine.initialize();
        assert_eq!(engine.population()[0], seed);

        let short = ReactorGenome {
            fuel_type: 1,
            layout: vec![EMPTY_GENE; 3],
        };
        assert!(matches!(
            engine.pre_seed([short]),
            Err(EvolutionError::Genome(GenomeError::WrongLength { .. }))
        ));
    }

    #[test]
    fn test_seed_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seeds.txt");
        std::fs::write(&path, format!("# seeds\n010A{}\n", "00".repeat(52))).unwrap();

        let mut config = small_config(4, 1);
        config.evolution.seed_file = Some(path.to_string_lossy().into_owned());
        let mut engine = engine(config);
        engine.initialize();
        assert_eq!(engine.population()[0].fuel_type, 1);
        assert_eq!(engine.population()[0].layout[1], 10);
    }

    #[test]
    fn test_tournament_prefers_fitter() {
        let mut engine = engine(small_config(4, 1));
        engine.initialize();
        let mut rigged = engine.evaluate_population().unwrap();
        for (i, e) in rigged.iter_mut().enumerate() {
            e.fitness = i as f64;
        }
        // With a tournament as large as the population the winner is rarely the worst.
        let picks: Vec<usize> = (0..20).map(|_| engine.select_index(&rigged)).collect();
        assert!(picks.iter().filter(|&&i| i == 0).count() < 10);
    }

    #[test]
    fn test_failed_evaluation_aborts_generation() {
        let mut layout = vec![EMPTY_GENE; 54];
        layout[0] = FUEL_GENE;
        layout[1] = 10;
        let doomed = ReactorGenome {
            fuel_type: 1,
            layout,
        };

        for panics in [true, false] {
            let factory = BrokenFactory {
                catalog: Catalog::default(),
                broken: 10,
                panics,
            };
            // Random fill never draws the broken id, so only the seed can fail.
            let mut config = small_config(2, 3);
            config.components.valid.retain(|&id| id != 10);
            let mut engine = EvolutionEngine::new(config, Arc::new(factory)).unwrap();
            engine.pre_seed([doomed.clone()]).unwrap();

            let generations = RefCell::new(0);
            let outcome = engine.run_with_callback(|_| *generations.borrow_mut() += 1);

            match outcome {
                Err(EvolutionError::Evaluation { genome, message }) => {
                    assert_eq!(genome, doomed.to_string());
                    if panics {
                        assert!(message.contains("component 10 exploded"), "{message}");
                    } else {
                        assert!(message.contains("10"), "{message}");
                    }
                }
                other => panic!("expected an evaluation error, got {:?}", other.map(|p| p.len())),
            }
            assert_eq!(*generations.borrow(), 0);
        }
    }
}
