//! Reactor Planner CLI - Simulate blueprints and evolve layouts from JSON configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use reactor_planner::{
    compute::{
        BlueprintCodec, Catalog, HexBlueprint, ReactorSimulator,
        evolution::{EvolutionEngine, top_distinct},
    },
    schema::GaConfig,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [top]", args[0]);
        eprintln!("       {} --simulate <blueprint> [--log]", args[0]);
        eprintln!("       {} --example", args[0]);
        eprintln!();
        eprintln!("Evolve reactor layouts from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to search configuration file");
        eprintln!("  top          Number of distinct layouts to report (default: 5)");
        eprintln!("  --simulate   Simulate one blueprint code and print the result");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    match args[1].as_str() {
        "--example" => print_example_config(),
        "--simulate" => {
            let Some(code) = args.get(2) else {
                eprintln!("Error: --simulate needs a blueprint code");
                std::process::exit(1);
            };
            let logging = args.iter().skip(3).any(|a| a == "--log");
            simulate(code, logging);
        }
        path => {
            let top: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(5);
            evolve(PathBuf::from(path), top);
        }
    }
}

fn simulate(code: &str, logging: bool) {
    let catalog = Catalog::default();
    let mut reactor = HexBlueprint::default()
        .decode(code, &catalog)
        .unwrap_or_else(|e| {
            eprintln!("Error decoding blueprint: {}", e);
            std::process::exit(1);
        });

    let mut simulator = ReactorSimulator::new();
    let result = simulator.run_with_sink(&mut reactor, logging, |line| {
        if logging {
            println!("{}", line);
        }
    });

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing result: {}", e);
            std::process::exit(1);
        }
    }
}

fn evolve(config_path: PathBuf, top: usize) {
    let config = GaConfig::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });

    println!("Reactor Planner Evolution");
    println!("=========================");
    println!("Grid: {}x{}", config.reactor.rows, config.reactor.cols);
    println!(
        "Population: {} x {} generations",
        config.evolution.population_size, config.evolution.max_generations
    );
    println!(
        "Pools: {} components, {} fuels",
        config.components.valid.len(),
        config.fuels.valid.len()
    );
    println!();

    let catalog = Arc::new(Catalog::default());
    let mut engine = EvolutionEngine::new(config.clone(), catalog.clone()).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let start = Instant::now();
    let population = engine
        .run_with_callback(|summary| {
            println!(
                "  Gen {}/{} [{:?}]: alpha={:.3}, avg={:.3}, stable={}, species={}, {:.2}s",
                summary.generation + 1,
                summary.total_generations,
                summary.phase,
                summary.alpha_fitness,
                summary.avg_fitness,
                summary.stable_count,
                summary.species_count,
                summary.elapsed_seconds
            );
        })
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });
    let elapsed = start.elapsed();

    println!();
    println!("Top {} distinct layouts:", top);
    let codec = HexBlueprint::from_config(&config.reactor);
    for (rank, best) in top_distinct(&population, &config.speciation, top)
        .into_iter()
        .enumerate()
    {
        let blueprint = best
            .genome
            .to_reactor(&config, catalog.as_ref())
            .ok()
            .and_then(|reactor| codec.encode(&reactor).ok())
            .unwrap_or_default();
        println!(
            "  #{} fitness={:.3} output={:.1} peak={:.0}",
            rank + 1,
            best.fitness,
            best.result.avg_output(),
            best.result.max_temp
        );
        println!("     {}", blueprint);
    }
    println!();
    println!(
        "Best fitness: {:.3} ({:.2}s)",
        engine.best_fitness(),
        elapsed.as_secs_f32()
    );
}

fn print_example_config() {
    match serde_json::to_string_pretty(&GaConfig::default()) {
        Ok(json) => {
            println!("Example configuration (config.json):");
            println!("{}", json);
        }
        Err(e) => {
            eprintln!("Error serializing config: {}", e);
            std::process::exit(1);
        }
    }
}
