//! Creature structure: a genome, the learners built from it, fitness and
//! a finite lifespan.

use crate::error::ConfigError;
use crate::genetics::Genome;
use crate::role::{Role, RoleMap};
use crate::urn::UrnLearner;
use rand::Rng;
use rand_distr::{Distribution, Geometric};
use serde::{Deserialize, Serialize};

/// Unique creature identifier
pub type CreatureId = u64;

/// Geometric lifespan distribution, measured in generations.
///
/// Support starts at 1: every creature lives through at least the
/// generation it was born into.
#[derive(Debug, Clone, Copy)]
pub struct Lifespan {
    dist: Geometric,
}

impl Lifespan {
    pub fn new(mean: f64) -> Result<Self, ConfigError> {
        if !mean.is_finite() || mean < 1.0 {
            return Err(ConfigError::InvalidLifespan(mean));
        }
        let dist = Geometric::new(1.0 / mean).map_err(|_| ConfigError::InvalidLifespan(mean))?;
        Ok(Self { dist })
    }

    /// Number of generations until replacement (>= 1)
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        // Geometric counts failures before the first success
        let failures = self.dist.sample(rng);
        u32::try_from(failures.saturating_add(1)).unwrap_or(u32::MAX)
    }
}

/// A member of the population
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Creature {
    // Identity
    pub id: CreatureId,
    pub generation: u32,
    pub parent1_id: Option<CreatureId>,
    pub parent2_id: Option<CreatureId>,

    // Innate biases and what was learned on top of them
    pub genes: Genome,
    pub learners: RoleMap<UrnLearner>,

    /// Selection credit, accumulated over the whole life
    pub fitness: f64,
    /// Generations left, counting the current one
    pub lifespan: u32,
    /// Episodes played per role
    pub episodes: RoleMap<u64>,
}

impl Creature {
    /// Build a creature from its genome; learners start from the genes
    pub fn new<R: Rng + ?Sized>(
        id: CreatureId,
        generation: u32,
        genes: Genome,
        lifespan: &Lifespan,
        rng: &mut R,
    ) -> Self {
        let learners = RoleMap {
            sender: UrnLearner::new(&genes.sender),
            receiver: UrnLearner::new(&genes.receiver),
        };

        Self {
            id,
            generation,
            parent1_id: None,
            parent2_id: None,
            genes,
            learners,
            fitness: 0.0,
            lifespan: lifespan.sample(rng),
            episodes: RoleMap::default(),
        }
    }

    /// Record the parents an offspring was bred from
    pub fn with_parents(mut self, parent1: CreatureId, parent2: Option<CreatureId>) -> Self {
        self.parent1_id = Some(parent1);
        self.parent2_id = parent2;
        self
    }

    /// Innate bias behind a decision, if the indices are in range
    pub fn bias(&self, role: Role, observation: usize, choice: usize) -> Option<f64> {
        self.genes[role].value(observation, choice)
    }

    /// Whether this creature is replaced at the next generation boundary
    pub fn is_expiring(&self) -> bool {
        self.lifespan <= 1
    }

    /// Whether this creature was bred rather than founded
    pub fn is_offspring(&self) -> bool {
        self.parent1_id.is_some()
    }
}
