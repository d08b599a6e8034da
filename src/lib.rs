//! # SEMIOSIS
//!
//! Evolutionary Lewis signaling game: a population of creatures learns to
//! communicate through Pólya-urn reinforcement while tournament selection
//! shapes the innate bias each creature is born with.
//!
//! ## Features
//!
//! - **Learning within a lifetime**: every decision is drawn from an urn
//!   and successful decisions add balls to it
//! - **Evolution across lifetimes**: fitness-driven tournaments, uniform
//!   crossover and resampling mutation of the innate bias
//! - **Configurable**: YAML configuration files
//! - **Reproducible**: Seeded random number generation, checkpoints carry
//!   the generator state
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use semiosis::{World, Config};
//!
//! // Create world with default config
//! let config = Config::default();
//! let mut world = World::new(config).unwrap();
//!
//! // Run simulation
//! world.run(100).unwrap();
//!
//! // Check results
//! println!("Population: {}", world.population());
//! println!("Success rate: {:.3}", world.stats.success_rate);
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use semiosis::Config;
//!
//! let mut config = Config::default();
//! config.game.num_states = 3;
//! config.game.num_messages = 3;
//! config.game.state_dist = vec![0.5, 0.3, 0.2];
//! config.genetics.mutation_rate = 0.1;
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Checkpoints
//!
//! ```rust,no_run
//! use semiosis::{World, Config};
//! use semiosis::checkpoint::Checkpoint;
//!
//! let mut world = World::new(Config::default()).unwrap();
//! world.run(50).unwrap();
//!
//! // Save checkpoint
//! let checkpoint = world.create_checkpoint();
//! checkpoint.save("checkpoint.bin").unwrap();
//!
//! // Load checkpoint
//! let loaded = Checkpoint::load("checkpoint.bin").unwrap();
//! let restored_world = World::from_checkpoint(loaded).unwrap();
//! ```

pub mod analysis;
pub mod checkpoint;
pub mod config;
pub mod creature;
pub mod environment;
pub mod error;
pub mod evolution;
pub mod genetics;
pub mod matching;
pub mod report;
pub mod role;
pub mod stats;
pub mod urn;
pub mod world;

// Re-export main types
pub use config::Config;
pub use creature::Creature;
pub use environment::SignalingGame;
pub use error::{ConfigError, ProtocolViolation, SimulationError};
pub use genetics::{Gene, GeneInit};
pub use role::{Role, RoleMap};
pub use urn::UrnLearner;
pub use world::World;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark
pub fn benchmark(generations: u32, population: usize) -> Result<BenchmarkResult, SimulationError> {
    use std::time::Instant;

    let mut config = Config::default();
    config.population.size = population;
    config.genetics.tournament_size = config.genetics.tournament_size.min(population);
    // A lone creature has no second parent
    config.genetics.crossover_enabled &= config.genetics.tournament_size >= 2;

    let mut world = World::new(config)?;
    let episodes_per_generation = (world.config.population.episodes_per_creature * population) as u64;

    let start = Instant::now();
    world.run(generations)?;
    let elapsed = start.elapsed().as_secs_f64().max(f64::EPSILON);

    Ok(BenchmarkResult {
        generations: world.generation,
        population: world.population(),
        episodes: world.generation as u64 * episodes_per_generation,
        elapsed_secs: elapsed,
        generations_per_second: world.generation as f64 / elapsed,
        episodes_per_second: (world.generation as u64 * episodes_per_generation) as f64 / elapsed,
        final_success_rate: world.stats.success_rate,
    })
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub generations: u32,
    pub population: usize,
    pub episodes: u64,
    pub elapsed_secs: f64,
    pub generations_per_second: f64,
    pub episodes_per_second: f64,
    pub final_success_rate: f64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Generations: {}", self.generations)?;
        writeln!(f, "Population: {}", self.population)?;
        writeln!(f, "Episodes: {}", self.episodes)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} generations/s, {:.0} episodes/s", self.generations_per_second, self.episodes_per_second)?;
        writeln!(f, "Final success rate: {:.3}", self.final_success_rate)?;
        Ok(())
    }
}
