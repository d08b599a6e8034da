//! Configuration system for semiosis runs.
//!
//! Supports YAML configuration files with sensible defaults.

use crate::environment::validate_distribution;
use crate::error::ConfigError;
use crate::genetics::gene::{validate_bounds, GeneInit};
use crate::matching::{Matching, MatchingBias};
use crate::role::RoleMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub game: GameConfig,
    pub population: PopulationConfig,
    pub genetics: GeneticsConfig,
    pub incentives: IncentiveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Signaling game configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Number of hidden states (receiver actions)
    pub num_states: usize,
    /// Number of messages the sender can emit
    pub num_messages: usize,
    /// Categorical distribution over hidden states
    pub state_dist: Vec<f64>,
}

/// Population and generation schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of creatures, constant across generations
    pub size: usize,
    /// Episodes per generation, per creature
    pub episodes_per_creature: usize,
    /// Generations to run
    pub generation_count: u32,
    /// Mean of the geometric lifespan, in generations
    pub lifespan_mean: f64,
    /// How receivers are matched to senders
    #[serde(default)]
    pub matching: MatchingBias,
    /// Whether a creature may play both roles in one episode
    #[serde(default = "default_true")]
    pub allow_self_pairing: bool,
    /// Zero a surviving creature's fitness when it is carried over
    #[serde(default)]
    pub reset_fitness_on_carry_over: bool,
}

/// Gene bounds, initialisation and variation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticsConfig {
    /// Lower bound of innate urn bias (>= 0)
    pub min_bias: f64,
    /// Upper bound of innate urn bias
    pub max_bias: f64,
    /// `random` or a constant broadcast to every position
    pub init_bias: GeneInit,
    /// Creatures sampled per tournament
    pub tournament_size: usize,
    /// Breed from the top two of a tournament instead of cloning the best
    pub crossover_enabled: bool,
    /// Per-position reset probability
    pub mutation_rate: f64,
}

/// Per-role payoff on a successful episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncentiveConfig {
    /// Selection credit
    pub success_fitness: RoleMap<f64>,
    /// Balls added to the urn
    pub success_reward: RoleMap<f64>,
}

/// Logging and checkpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Generations between checkpoints
    pub checkpoint_interval: u32,
    /// Generations between stats log lines
    pub stats_interval: u32,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            population: PopulationConfig::default(),
            genetics: GeneticsConfig::default(),
            incentives: IncentiveConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            num_states: 2,
            num_messages: 2,
            state_dist: vec![0.5, 0.5],
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: 50,
            episodes_per_creature: 10,
            generation_count: 200,
            lifespan_mean: 3.0,
            matching: MatchingBias::Uniform,
            allow_self_pairing: true,
            reset_fitness_on_carry_over: false,
        }
    }
}

impl Default for GeneticsConfig {
    fn default() -> Self {
        Self {
            min_bias: 0.0,
            max_bias: 10.0,
            init_bias: GeneInit::Random,
            tournament_size: 5,
            crossover_enabled: true,
            mutation_rate: 0.05,
        }
    }
}

impl Default for IncentiveConfig {
    fn default() -> Self {
        Self {
            success_fitness: RoleMap::new(1.0, 1.0),
            success_reward: RoleMap::new(1.0, 1.0),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 50,
            stats_interval: 10,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let game = &self.game;
        if game.num_states == 0 {
            return Err(ConfigError::Zero("num_states"));
        }
        if game.num_messages == 0 {
            return Err(ConfigError::Zero("num_messages"));
        }
        validate_distribution(&game.state_dist, game.num_states)?;

        let population = &self.population;
        if population.size == 0 {
            return Err(ConfigError::Zero("population size"));
        }
        if population.episodes_per_creature == 0 {
            return Err(ConfigError::Zero("episodes_per_creature"));
        }
        if !population.lifespan_mean.is_finite() || population.lifespan_mean < 1.0 {
            return Err(ConfigError::InvalidLifespan(population.lifespan_mean));
        }
        // Builds the per-slot distributions, which rejects bad groups and
        // slots left without a partner
        Matching::new(population.matching, population.size, population.allow_self_pairing)?;

        let genetics = &self.genetics;
        validate_bounds(genetics.min_bias, genetics.max_bias)?;
        if genetics.min_bias < 0.0 {
            return Err(ConfigError::NegativeBias(genetics.min_bias));
        }
        if let GeneInit::Constant(value) = genetics.init_bias {
            if !(genetics.min_bias..=genetics.max_bias).contains(&value) {
                return Err(ConfigError::InitOutOfBounds {
                    value,
                    min: genetics.min_bias,
                    max: genetics.max_bias,
                });
            }
        }
        if genetics.tournament_size == 0 {
            return Err(ConfigError::Zero("tournament_size"));
        }
        if genetics.tournament_size > population.size {
            return Err(ConfigError::TournamentTooLarge {
                tournament: genetics.tournament_size,
                population: population.size,
            });
        }
        if genetics.crossover_enabled && genetics.tournament_size < 2 {
            return Err(ConfigError::TournamentTooSmall(genetics.tournament_size));
        }
        if !(0.0..=1.0).contains(&genetics.mutation_rate) {
            return Err(ConfigError::InvalidRate {
                name: "mutation_rate",
                value: genetics.mutation_rate,
            });
        }

        let incentives = [
            ("success_fitness", &self.incentives.success_fitness),
            ("success_reward", &self.incentives.success_reward),
        ];
        for (name, schedule) in incentives {
            for (role, &value) in schedule.iter() {
                if !value.is_finite() || value < 0.0 {
                    return Err(ConfigError::InvalidIncentive {
                        name: format!("{}.{}", name, role),
                        value,
                    });
                }
            }
        }

        if self.logging.stats_interval == 0 {
            return Err(ConfigError::Zero("stats_interval"));
        }
        if self.logging.checkpoint_interval == 0 {
            return Err(ConfigError::Zero("checkpoint_interval"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.population.matching = MatchingBias::Group { groups: 5 };
        config.genetics.init_bias = GeneInit::Constant(2.0);

        let yaml = serde_yaml::to_string(&config).unwrap();
        let loaded: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.population.size, loaded.population.size);
        assert_eq!(loaded.population.matching, MatchingBias::Group { groups: 5 });
        assert_eq!(loaded.genetics.init_bias, GeneInit::Constant(2.0));
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = r#"
game:
  num_states: 3
  num_messages: 3
  state_dist: [0.2, 0.3, 0.5]
population:
  size: 12
  episodes_per_creature: 4
  generation_count: 10
  lifespan_mean: 2.0
genetics:
  min_bias: 0.0
  max_bias: 5.0
  init_bias: random
  tournament_size: 3
  crossover_enabled: false
  mutation_rate: 0.1
incentives:
  success_fitness: { sender: 1.0, receiver: 0.0 }
  success_reward: { sender: 1.0, receiver: 1.0 }
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.population.matching, MatchingBias::Uniform);
        assert!(config.population.allow_self_pairing);
        assert!(!config.population.reset_fitness_on_carry_over);
        assert_eq!(config.genetics.init_bias, GeneInit::Random);
        assert_eq!(config.logging.stats_interval, 10);
    }

    #[test]
    fn test_rejects_bad_bounds() {
        let mut config = Config::default();
        config.genetics.min_bias = 5.0;
        config.genetics.max_bias = 1.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBounds { .. })));

        let mut config = Config::default();
        config.genetics.min_bias = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::NegativeBias(_))));

        let mut config = Config::default();
        config.genetics.init_bias = GeneInit::Constant(11.0);
        assert!(matches!(config.validate(), Err(ConfigError::InitOutOfBounds { .. })));
    }

    #[test]
    fn test_rejects_bad_distribution() {
        let mut config = Config::default();
        config.game.state_dist = vec![0.5, 0.4];
        assert!(matches!(config.validate(), Err(ConfigError::DistributionSum(_))));

        let mut config = Config::default();
        config.game.num_states = 3;
        assert!(matches!(config.validate(), Err(ConfigError::DistributionLength { .. })));
    }

    #[test]
    fn test_rejects_bad_tournament() {
        let mut config = Config::default();
        config.genetics.tournament_size = config.population.size + 1;
        assert!(matches!(config.validate(), Err(ConfigError::TournamentTooLarge { .. })));

        let mut config = Config::default();
        config.genetics.tournament_size = 1;
        assert!(matches!(config.validate(), Err(ConfigError::TournamentTooSmall(1))));

        config.genetics.crossover_enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_rates_and_incentives() {
        let mut config = Config::default();
        config.genetics.mutation_rate = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRate { .. })));

        let mut config = Config::default();
        config.incentives.success_reward.receiver = -1.0;
        match config.validate() {
            Err(ConfigError::InvalidIncentive { name, .. }) => assert_eq!(name, "success_reward.receiver"),
            other => panic!("unexpected: {:?}", other),
        }

        let mut config = Config::default();
        config.population.lifespan_mean = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLifespan(_))));
    }

    #[test]
    fn test_rejects_bad_matching() {
        let mut config = Config::default();
        config.population.matching = MatchingBias::Group { groups: 100 };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidGroups { .. })));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let config = Config::default();
        config.save(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.game.state_dist, config.game.state_dist);
    }
}
