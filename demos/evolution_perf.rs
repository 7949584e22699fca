//! Quick evolution performance test

use std::sync::Arc;
use std::time::Instant;

use reactor_planner::{
    GaConfig,
    compute::{Catalog, evolution::EvolutionEngine},
};

fn config(population: usize, generations: usize, ticks: u32) -> GaConfig {
    let mut config = GaConfig::default();
    config.reactor.settings.max_simulation_ticks = ticks;
    config.evolution.population_size = population;
    config.evolution.max_generations = generations;
    config.evolution.random_seed = Some(42);
    config
}

fn main() {
    env_logger::init();
    let catalog = Arc::new(Catalog::default());

    println!("=== Evolution Performance Test ===\n");

    // Test different simulation lengths
    for ticks in [1_000, 5_000, 20_000] {
        println!("Max ticks: {}", ticks);

        let start = Instant::now();
        let mut engine = match EvolutionEngine::new(config(40, 5, ticks), catalog.clone()) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        };
        let population = match engine.run() {
            Ok(population) => population,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        };
        let elapsed = start.elapsed();

        let total_evals = engine.generation() * population.len();
        let evals_per_sec = total_evals as f64 / elapsed.as_secs_f64();

        println!("  Generations:    {}", engine.generation());
        println!("  Evaluations:    {}", total_evals);
        println!("  Elapsed:        {:.2}s", elapsed.as_secs_f64());
        println!("  Evals/sec:      {:.1}", evals_per_sec);
        println!("  Best fitness:   {:.4}", engine.best_fitness());
        println!();
    }

    println!("=== Scalability Test (fixed 5000 ticks) ===\n");

    // Test different worker counts
    for workers in [1, 2, 4, 8] {
        let mut config = config(80, 3, 5_000);
        config.evolution.evaluation_workers = Some(workers);

        let start = Instant::now();
        let result = EvolutionEngine::new(config, catalog.clone())
            .and_then(|mut engine| engine.run().map(|p| (engine.generation(), p.len())));
        let (generations, population) = match result {
            Ok(counts) => counts,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        };
        let elapsed = start.elapsed();

        let total_evals = generations * population;
        println!(
            "Workers {}: {} evals in {:.2}s ({:.1} evals/sec)",
            workers,
            total_evals,
            elapsed.as_secs_f64(),
            total_evals as f64 / elapsed.as_secs_f64()
        );
    }
}
