//! Genetics module - bias genes, crossover and mutation.

pub mod gene;

pub use gene::{Gene, GeneInit};

use crate::config::Config;
use crate::error::{ConfigError, ProtocolViolation};
use crate::role::{Role, RoleMap};
use rand::Rng;

/// One bias gene per role
pub type Genome = RoleMap<Gene>;

/// Shape, bounds and initialisation shared by every genome in a run.
///
/// The sender gene is indexed `(state, message)`, the receiver gene
/// `(message, state)`.
#[derive(Debug, Clone, PartialEq)]
pub struct GenomeTemplate {
    pub num_states: usize,
    pub num_messages: usize,
    pub min: f64,
    pub max: f64,
    pub init: GeneInit,
}

impl GenomeTemplate {
    pub fn from_config(config: &Config) -> Self {
        Self {
            num_states: config.game.num_states,
            num_messages: config.game.num_messages,
            min: config.genetics.min_bias,
            max: config.genetics.max_bias,
            init: config.genetics.init_bias,
        }
    }

    /// `(observations, choices)` for a role's gene
    pub fn shape(&self, role: Role) -> (usize, usize) {
        match role {
            Role::Sender => (self.num_states, self.num_messages),
            Role::Receiver => (self.num_messages, self.num_states),
        }
    }

    /// Fresh founder genome
    pub fn spawn<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Genome, ConfigError> {
        Ok(RoleMap {
            sender: Gene::new(self.shape(Role::Sender), self.min, self.max, self.init, rng)?,
            receiver: Gene::new(self.shape(Role::Receiver), self.min, self.max, self.init, rng)?,
        })
    }
}

/// Role-wise uniform crossover of two genomes
pub fn crossover_genomes<R: Rng + ?Sized>(
    a: &Genome,
    b: &Genome,
    rng: &mut R,
) -> Result<Genome, ProtocolViolation> {
    Ok(RoleMap {
        sender: a.sender.crossover(&b.sender, rng)?,
        receiver: a.receiver.crossover(&b.receiver, rng)?,
    })
}

/// Mutate both genes of a genome in place
pub fn mutate_genome<R: Rng + ?Sized>(genome: &mut Genome, rate: f64, rng: &mut R) {
    genome.sender.mutate(rate, rng);
    genome.receiver.mutate(rate, rng);
}
