//! SEMIOSIS - CLI Entry Point
//!
//! Evolutionary signaling game simulator.

use clap::{Parser, Subcommand};
use semiosis::analysis::{Convention, ExportSystem};
use semiosis::checkpoint::{Checkpoint, CheckpointManager};
use semiosis::report::CreatureReport;
use semiosis::stats::fittest;
use semiosis::{benchmark, Config, World};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "semiosis")]
#[command(version)]
#[command(about = "Co-evolution of signaling conventions between Polya-urn learners")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a new simulation
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of generations (defaults to the configured count)
        #[arg(short, long)]
        generations: Option<u32>,

        /// Output directory for checkpoints and exports
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Resume simulation from checkpoint
    Resume {
        /// Checkpoint file to resume from
        #[arg(short, long)]
        checkpoint: PathBuf,

        /// Number of additional generations
        #[arg(short, long, default_value = "100")]
        generations: u32,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of generations
        #[arg(short, long, default_value = "50")]
        generations: u32,

        /// Population size
        #[arg(short, long, default_value = "100")]
        population: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Analyze a checkpoint file
    Analyze {
        /// Checkpoint file
        checkpoint: PathBuf,
    },
}

fn init_logging(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            generations,
            output,
            seed,
            quiet,
        } => run_simulation(config, generations, output, seed, quiet),

        Commands::Resume {
            checkpoint,
            generations,
            output,
        } => {
            init_logging("info");
            resume_simulation(checkpoint, generations, output)
        }

        Commands::Benchmark { generations, population } => {
            init_logging("info");
            run_benchmark(generations, population)
        }

        Commands::Init { output } => {
            init_logging("info");
            generate_config(output)
        }

        Commands::Analyze { checkpoint } => {
            init_logging("info");
            analyze_checkpoint(checkpoint)
        }
    }
}

fn run_simulation(
    config_path: PathBuf,
    generations: Option<u32>,
    output: PathBuf,
    seed: Option<u64>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // Load or create config
    let (config, source) = if config_path.exists() {
        (Config::from_file(&config_path)?, format!("{:?}", config_path))
    } else {
        (Config::default(), "defaults".to_string())
    };

    init_logging(if quiet { "warn" } else { config.logging.log_level.as_str() });
    log::info!("Configuration: {}", source);

    // Create output directory
    std::fs::create_dir_all(&output)?;

    // Create world
    let mut world = match seed {
        Some(s) => World::new_with_seed(config.clone(), s)?,
        None => World::new(config.clone())?,
    };
    let generations = generations.unwrap_or(config.population.generation_count);

    log::info!("Starting simulation");
    log::info!("  Population: {}", world.population());
    log::info!(
        "  Game: {} states, {} messages",
        config.game.num_states,
        config.game.num_messages
    );
    log::info!("  Generations: {}", generations);
    log::info!("  Seed: {}", world.seed());

    let mut checkpoint_mgr = CheckpointManager::new(
        output.to_string_lossy().to_string(),
        config.logging.checkpoint_interval,
        10, // Keep last 10 checkpoints
    );

    let start = Instant::now();
    for _ in 0..generations {
        world.step()?;
        save_periodic(&mut checkpoint_mgr, &world);
    }
    let elapsed = start.elapsed();

    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Generations: {}", world.generation);
    println!(
        "Speed: {:.1} generations/s",
        world.generation as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );
    println!("Final success rate: {:.3}", world.stats.success_rate);

    write_outputs(&world, &output)?;

    if let Some(best) = world.fittest() {
        println!();
        println!("{}", CreatureReport::new(best).with_state_dist(&world.config.game.state_dist));
    }

    Ok(())
}

fn resume_simulation(
    checkpoint_path: PathBuf,
    generations: u32,
    output: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Loading checkpoint: {:?}", checkpoint_path);

    let checkpoint = Checkpoint::load(&checkpoint_path)?;
    let mut world = World::from_checkpoint(checkpoint)?;

    log::info!("Resumed at generation {}", world.generation);
    log::info!("Population: {}", world.population());
    log::info!("Running {} additional generations", generations);

    std::fs::create_dir_all(&output)?;

    let mut checkpoint_mgr = CheckpointManager::new(
        output.to_string_lossy().to_string(),
        world.config.logging.checkpoint_interval,
        10,
    );

    let start = Instant::now();
    for _ in 0..generations {
        world.step()?;
        save_periodic(&mut checkpoint_mgr, &world);
    }
    let elapsed = start.elapsed();

    println!();
    println!("=== Resume Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Final generation: {}", world.generation);
    println!("Final success rate: {:.3}", world.stats.success_rate);

    write_outputs(&world, &output)?;

    Ok(())
}

fn save_periodic(checkpoint_mgr: &mut CheckpointManager, world: &World) {
    if checkpoint_mgr.should_save(world.generation) {
        let checkpoint = world.create_checkpoint();
        match checkpoint_mgr.save(&checkpoint) {
            Ok(path) => log::info!("  Checkpoint saved: {}", path),
            Err(e) => log::warn!("  Checkpoint error: {}", e),
        }
    }
}

fn write_outputs(world: &World, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    // Final checkpoint
    let final_path = output.join("checkpoint_final.bin");
    world.create_checkpoint().save(&final_path)?;
    println!("Final checkpoint: {:?}", final_path);

    // Stats history
    let stats_path = output.join("stats_history.json");
    world.stats_history.save(&stats_path.to_string_lossy())?;
    println!("Stats history: {:?}", stats_path);

    let csv_path = output.join("stats.csv");
    ExportSystem::export_stats_csv(&world.stats_history, &csv_path)?;
    println!("Stats CSV: {:?}", csv_path);

    let population_path = output.join("population.csv");
    ExportSystem::export_population_csv(&world.creatures, &world.config.game.state_dist, &population_path)?;
    println!("Population CSV: {:?}", population_path);

    Ok(())
}

fn run_benchmark(generations: u32, population: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== SEMIOSIS Benchmark ===");
    println!("Generations: {}", generations);
    println!("Population: {}", population);
    println!();

    let result = benchmark(generations, population)?;
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}

fn analyze_checkpoint(checkpoint_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Checkpoint Analysis ===");
    println!("File: {:?}", checkpoint_path);
    println!();

    let checkpoint = Checkpoint::load(&checkpoint_path)?;
    let state_dist = &checkpoint.config.game.state_dist;

    println!("Generation: {}", checkpoint.generation);
    println!("Population: {}", checkpoint.creatures.len());
    println!("Seed: {}", checkpoint.random_seed);
    if let Some(last) = checkpoint.stats_history.latest() {
        println!("Last success rate: {:.3}", last.success_rate);
    }
    println!();

    let creatures = &checkpoint.creatures;
    if !creatures.is_empty() {
        let n = creatures.len() as f64;
        let conventions: Vec<Convention> = creatures
            .iter()
            .map(|c| Convention::analyze(&c.learners.sender, &c.learners.receiver, state_dist))
            .collect();

        let avg_fitness = creatures.iter().map(|c| c.fitness).sum::<f64>() / n;
        let avg_self = conventions.iter().map(|c| c.expected_success).sum::<f64>() / n;
        let systems = conventions.iter().filter(|c| c.is_signaling_system()).count();
        let founders = creatures.iter().filter(|c| !c.is_offspring()).count();

        println!("Average fitness: {:.2}", avg_fitness);
        println!("Average self-play success: {:.3}", avg_self);
        println!(
            "Signaling systems: {} ({:.1}%)",
            systems,
            100.0 * systems as f64 / n
        );
        println!("Founders still alive: {}", founders);

        if let Some(best) = fittest(creatures) {
            println!();
            println!("{}", CreatureReport::new(best).with_state_dist(state_dist));
        }
    }

    println!(
        "Checkpoint size: {:.2} MB",
        checkpoint.size_bytes() as f64 / 1_000_000.0
    );

    Ok(())
}
