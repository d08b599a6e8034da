//! Error taxonomy.
//!
//! Everything here is either a bad configuration, caught before the loop
//! starts, or a protocol violation, which means a caller bug. Nothing is
//! retryable.

use crate::creature::CreatureId;
use crate::role::Role;
use thiserror::Error;

/// Invalid configuration, rejected before any generation runs
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid bias bounds: min {min} must be finite and <= max {max}")]
    InvalidBounds { min: f64, max: f64 },

    #[error("min_bias {0} is negative; urn counts must never drop below zero")]
    NegativeBias(f64),

    #[error("initial bias {value} lies outside [{min}, {max}]")]
    InitOutOfBounds { value: f64, min: f64, max: f64 },

    #[error("state distribution has {found} entries, expected {expected}")]
    DistributionLength { expected: usize, found: usize },

    #[error("state distribution entry {index} is {value}; probabilities must be finite and >= 0")]
    InvalidProbability { index: usize, value: f64 },

    #[error("state distribution sums to {0}, expected 1")]
    DistributionSum(f64),

    #[error("tournament size {tournament} exceeds population size {population}")]
    TournamentTooLarge { tournament: usize, population: usize },

    #[error("crossover needs a tournament of at least 2, got {0}")]
    TournamentTooSmall(usize),

    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f64 },

    #[error("lifespan mean must be >= 1, got {0}")]
    InvalidLifespan(f64),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{name} must be finite and >= 0, got {value}")]
    InvalidIncentive { name: String, value: f64 },

    #[error("cannot split {population} creatures into {groups} matching groups")]
    InvalidGroups { groups: usize, population: usize },

    #[error("self-pairing is disabled but slot {0} has no other candidate receiver")]
    NoPartner(usize),

    #[error("invalid init_bias {0:?}: expected \"random\" or a number")]
    InvalidInit(String),

    #[error("population holds {found} creatures, configuration expects {expected}")]
    PopulationMismatch { expected: usize, found: usize },

    #[error("creature {id} has a {role} gene or urn of shape {found:?}, expected {expected:?}")]
    GenomeShape {
        id: CreatureId,
        role: Role,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Anything that can stop a run
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),
}

/// A caller broke the game or learner protocol
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("episode has not been reset yet")]
    NotStarted,

    #[error("episode is finished; reset before stepping again")]
    EpisodeFinished,

    #[error("receiver observed before any message was sent")]
    NoMessage,

    #[error("{role} action {action} out of range (limit {limit})")]
    ActionOutOfRange { role: Role, action: usize, limit: usize },

    #[error("observation {observation} out of range (limit {limit})")]
    ObservationOutOfRange { observation: usize, limit: usize },

    #[error("choice {choice} out of range (limit {limit})")]
    ChoiceOutOfRange { choice: usize, limit: usize },

    #[error("genes differ in shape or bounds")]
    IncompatibleGenes,

    #[error("tournament drew no creatures")]
    EmptyTournament,
}
