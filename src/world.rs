//! World simulation engine - the population evolution loop.
//!
//! A generation runs in three phases:
//! 1. `episodes_per_creature * population` episodes, each trained as soon
//!    as its reward is known;
//! 2. diagnostics over the population that just played;
//! 3. generational replacement, swapped in as a whole.
//!
//! Replacement only starts after every episode of the generation has
//! finished, so selection never sees a fitness value that is still moving.

use crate::checkpoint::Checkpoint;
use crate::config::Config;
use crate::creature::{Creature, CreatureId};
use crate::environment::SignalingGame;
use crate::error::{ConfigError, ProtocolViolation};
use crate::evolution::EvolutionEngine;
use crate::genetics::GenomeTemplate;
use crate::matching::Matching;
use crate::report::CreatureReport;
use crate::role::{Role, RoleMap};
use crate::stats::{fittest, GenerationTally, Stats, StatsHistory};
use crate::urn::UrnLearner;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// What happened in one episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeOutcome {
    pub state: usize,
    pub message: usize,
    pub action: usize,
    pub success: bool,
}

impl EpisodeOutcome {
    /// `(observation, choice)` taken by `role`
    pub fn decision(&self, role: Role) -> (usize, usize) {
        match role {
            Role::Sender => (self.state, self.message),
            Role::Receiver => (self.message, self.action),
        }
    }
}

/// Play one episode to completion.
///
/// Every turn routes the acting role's observation through its learner and
/// buffers the decision before the game advances. Rewards and training are
/// left to the caller.
pub fn run_episode<R: Rng + ?Sized>(
    game: &mut SignalingGame,
    mut learners: RoleMap<&mut UrnLearner>,
    rng: &mut R,
) -> Result<EpisodeOutcome, ProtocolViolation> {
    game.reset(rng);

    for role in Role::ALL {
        let observation = game.observe(role)?;
        let learner = &mut learners[role];
        let choice = learner.get_action(observation, rng)?;
        learner.store_buffer(observation, choice)?;
        game.step(choice)?;
    }

    Ok(EpisodeOutcome {
        state: game.state().ok_or(ProtocolViolation::NotStarted)?,
        message: game.message().ok_or(ProtocolViolation::NoMessage)?,
        action: game.action().ok_or(ProtocolViolation::NotStarted)?,
        success: game.success(),
    })
}

/// Two distinct elements of a slice, mutably
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(a, b);
    if a < b {
        let (lo, hi) = items.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = items.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}

/// Reject a restored population that the matching or the game cannot index
fn check_population(creatures: &[Creature], template: &GenomeTemplate, matching: &Matching) -> Result<(), ConfigError> {
    if creatures.len() != matching.population_size() {
        return Err(ConfigError::PopulationMismatch {
            expected: matching.population_size(),
            found: creatures.len(),
        });
    }

    for creature in creatures {
        for role in Role::ALL {
            let expected = template.shape(role);
            let learner = &creature.learners[role];
            let shapes = [
                creature.genes[role].shape(),
                (learner.num_observations(), learner.num_choices()),
            ];
            if let Some(&found) = shapes.iter().find(|&&shape| shape != expected) {
                return Err(ConfigError::GenomeShape {
                    id: creature.id,
                    role,
                    expected,
                    found,
                });
            }
        }
    }

    Ok(())
}

/// The simulation world
pub struct World {
    // Population
    pub creatures: Vec<Creature>,

    // Environment
    pub game: SignalingGame,
    pub matching: Matching,

    // State
    pub generation: u32,

    // Configuration
    pub config: Config,

    // Statistics
    pub stats: Stats,
    pub stats_history: StatsHistory,
    tally: GenerationTally,

    // Evolution
    pub evolution_engine: EvolutionEngine,

    // ID generation
    next_creature_id: CreatureId,

    // Random number generator (seeded for reproducibility)
    rng: ChaCha8Rng,
    seed: u64,
}

impl World {
    /// Create a new world with the given configuration
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, seed)
    }

    /// Create a new world with a specific seed for reproducibility
    pub fn new_with_seed(config: Config, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let game = SignalingGame::new(config.game.num_states, config.game.num_messages, &config.game.state_dist)?;
        let matching = Matching::new(
            config.population.matching,
            config.population.size,
            config.population.allow_self_pairing,
        )?;
        let evolution_engine = EvolutionEngine::from_config(&config)?;

        // Founders
        let template = GenomeTemplate::from_config(&config);
        let mut creatures = Vec::with_capacity(config.population.size);
        for id in 0..config.population.size as CreatureId {
            let genes = template.spawn(&mut rng)?;
            creatures.push(Creature::new(id, 0, genes, &evolution_engine.lifespan, &mut rng));
        }
        let next_creature_id = creatures.len() as CreatureId;

        log::debug!(
            "World created: population={}, states={}, messages={}, seed={}",
            creatures.len(),
            config.game.num_states,
            config.game.num_messages,
            seed
        );

        Ok(Self {
            creatures,
            game,
            matching,
            generation: 0,
            config,
            stats: Stats::new(),
            stats_history: StatsHistory::new(),
            tally: GenerationTally::new(),
            evolution_engine,
            next_creature_id,
            rng,
            seed,
        })
    }

    /// Restore world from checkpoint, continuing the same random stream
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Result<Self, ConfigError> {
        let config = checkpoint.config;
        config.validate()?;

        let game = SignalingGame::new(config.game.num_states, config.game.num_messages, &config.game.state_dist)?;
        let matching = Matching::new(
            config.population.matching,
            config.population.size,
            config.population.allow_self_pairing,
        )?;
        let evolution_engine = EvolutionEngine::from_config(&config)?;
        check_population(&checkpoint.creatures, &GenomeTemplate::from_config(&config), &matching)?;
        let stats = checkpoint.stats_history.latest().cloned().unwrap_or_default();

        Ok(Self {
            creatures: checkpoint.creatures,
            game,
            matching,
            generation: checkpoint.generation,
            config,
            stats,
            stats_history: checkpoint.stats_history,
            tally: GenerationTally::new(),
            evolution_engine,
            next_creature_id: checkpoint.next_creature_id,
            rng: checkpoint.rng,
            seed: checkpoint.random_seed,
        })
    }

    /// Create checkpoint of current state
    pub fn create_checkpoint(&self) -> Checkpoint {
        Checkpoint::new(
            self.generation,
            self.config.clone(),
            self.creatures.clone(),
            self.stats_history.clone(),
            self.next_creature_id,
            self.seed,
            self.rng.clone(),
        )
    }

    /// Run one full generation and return its statistics
    pub fn step(&mut self) -> Result<&Stats, ProtocolViolation> {
        self.tally = GenerationTally::new();

        // Phase 1: episodes, each trained immediately
        let episodes = self.config.population.episodes_per_creature * self.creatures.len();
        for _ in 0..episodes {
            let sender = self.matching.sample_sender(&mut self.rng);
            let receiver = self.matching.sample_receiver(sender, &mut self.rng);
            self.play_episode(sender, receiver)?;
        }

        // Phase 2: diagnostics over the population that just played
        let mut stats = Stats::new();
        stats.update(self.generation, &self.creatures, &self.tally);
        if log::log_enabled!(log::Level::Debug) {
            if let Some(best) = fittest(&self.creatures) {
                log::debug!("{}", CreatureReport::new(best).with_state_dist(&self.config.game.state_dist));
            }
        }

        // Phase 3: replacement, swapped in as a whole
        let (next, replacement) = self.evolution_engine.next_generation(
            &self.creatures,
            &mut self.next_creature_id,
            self.generation + 1,
            &mut self.rng,
        )?;
        self.creatures = next;
        stats.offspring = replacement.offspring;
        stats.survivors = replacement.survivors;

        if self.generation % self.config.logging.stats_interval == 0 {
            log::info!("{}", stats.summary());
        }

        self.stats_history.record(stats.clone());
        self.stats = stats;
        self.generation += 1;

        Ok(&self.stats)
    }

    /// Play one episode between two population slots, then settle rewards,
    /// fitness and training for both roles.
    ///
    /// `sender` and `receiver` may be the same slot.
    pub fn play_episode(&mut self, sender: usize, receiver: usize) -> Result<EpisodeOutcome, ProtocolViolation> {
        let learners = if sender == receiver {
            let own = &mut self.creatures[sender].learners;
            RoleMap::new(&mut own.sender, &mut own.receiver)
        } else {
            let (s, r) = pair_mut(&mut self.creatures, sender, receiver);
            RoleMap::new(&mut s.learners.sender, &mut r.learners.receiver)
        };
        let outcome = run_episode(&mut self.game, learners, &mut self.rng)?;

        self.tally.record_episode(outcome.success);
        let slots = RoleMap::new(sender, receiver);
        let incentives = &self.config.incentives;

        for role in Role::ALL {
            let creature = &mut self.creatures[slots[role]];
            let (observation, choice) = outcome.decision(role);

            let reward = if outcome.success {
                creature.fitness += incentives.success_fitness[role];
                incentives.success_reward[role]
            } else {
                0.0
            };

            let learner = &mut creature.learners[role];
            learner.update_reward(reward);
            learner.train();
            creature.episodes[role] += 1;

            let bias = creature.bias(role, observation, choice).unwrap_or(0.0);
            self.tally.record_role(role, outcome.success, reward, bias);
        }

        Ok(outcome)
    }

    /// Run simulation for specified number of generations
    pub fn run(&mut self, generations: u32) -> Result<(), ProtocolViolation> {
        for _ in 0..generations {
            self.step()?;
        }
        Ok(())
    }

    /// Run the generations left until `generation_count`
    pub fn run_to_completion(&mut self) -> Result<(), ProtocolViolation> {
        self.run(self.remaining_generations())
    }

    /// Run simulation with callback for progress updates
    pub fn run_with_callback<F>(&mut self, generations: u32, mut callback: F) -> Result<(), ProtocolViolation>
    where
        F: FnMut(&World),
    {
        for _ in 0..generations {
            self.step()?;
            callback(self);
        }
        Ok(())
    }

    /// Generations left before the configured count is reached
    pub fn remaining_generations(&self) -> u32 {
        self.config.population.generation_count.saturating_sub(self.generation)
    }

    pub fn is_finished(&self) -> bool {
        self.remaining_generations() == 0
    }

    /// Get current population count
    pub fn population(&self) -> usize {
        self.creatures.len()
    }

    /// Highest-fitness creature in the current population
    pub fn fittest(&self) -> Option<&Creature> {
        fittest(&self.creatures)
    }

    /// Get seed for reproducibility
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetics::{Gene, GeneInit};

    fn test_config() -> Config {
        let mut config = Config::default();
        config.population.size = 12;
        config.population.episodes_per_creature = 5;
        config.population.generation_count = 20;
        config.genetics.tournament_size = 3;
        config
    }

    #[test]
    fn test_world_creation() {
        let config = test_config();
        let world = World::new(config.clone()).unwrap();

        assert_eq!(world.population(), config.population.size);
        assert_eq!(world.generation, 0);
        assert!(world.creatures.iter().all(|c| c.lifespan >= 1 && c.fitness == 0.0));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = test_config();
        config.genetics.tournament_size = 13;
        assert!(matches!(
            World::new_with_seed(config, 1),
            Err(ConfigError::TournamentTooLarge { .. })
        ));
    }

    #[test]
    fn test_world_step() {
        let config = test_config();
        let mut world = World::new_with_seed(config, 1).unwrap();

        let stats = world.step().unwrap().clone();

        assert_eq!(world.generation, 1);
        assert_eq!(stats.generation, 0);
        assert_eq!(stats.episodes, 60);
        assert_eq!(stats.offspring + stats.survivors, 12);
        assert!((0.0..=1.0).contains(&stats.success_rate));
        assert_eq!(world.stats_history.len(), 1);
    }

    #[test]
    fn test_population_size_invariant() {
        let config = test_config();
        let mut world = World::new_with_seed(config, 2).unwrap();

        world
            .run_with_callback(15, |w| assert_eq!(w.population(), 12))
            .unwrap();
        assert_eq!(world.stats_history.len(), 15);
    }

    #[test]
    fn test_episode_credits_both_roles() {
        let mut config = test_config();
        config.incentives.success_fitness = RoleMap::new(2.0, 3.0);
        let mut world = World::new_with_seed(config, 3).unwrap();

        let mut successes = 0;
        for _ in 0..40 {
            let outcome = world.play_episode(0, 1).unwrap();
            if outcome.success {
                successes += 1;
            }
        }

        assert_eq!(world.creatures[0].fitness, 2.0 * successes as f64);
        assert_eq!(world.creatures[1].fitness, 3.0 * successes as f64);
        assert_eq!(world.creatures[0].episodes.sender, 40);
        assert_eq!(world.creatures[1].episodes.receiver, 40);
        assert!(world.creatures[0].learners.sender.pending().is_empty());
        assert!(world.creatures[1].learners.receiver.pending().is_empty());
    }

    #[test]
    fn test_self_pairing_uses_both_learners() {
        let mut config = test_config();
        config.genetics.init_bias = GeneInit::Constant(0.0);
        let mut world = World::new_with_seed(config, 4).unwrap();

        let before: f64 = (0..2).map(|obs| world.creatures[5].learners.sender.sum(obs)).sum();
        let mut successes = 0;
        for _ in 0..30 {
            if world.play_episode(5, 5).unwrap().success {
                successes += 1;
            }
        }
        let after: f64 = (0..2).map(|obs| world.creatures[5].learners.sender.sum(obs)).sum();

        assert_eq!(world.creatures[5].episodes, RoleMap::new(30, 30));
        assert!((after - before - successes as f64).abs() < 1e-9);
    }

    #[test]
    fn test_reproducibility() {
        let config = test_config();

        let mut world1 = World::new_with_seed(config.clone(), 42).unwrap();
        let mut world2 = World::new_with_seed(config, 42).unwrap();

        world1.run(10).unwrap();
        world2.run(10).unwrap();

        assert_eq!(world1.stats_history.success_series(), world2.stats_history.success_series());
        let fitness1: Vec<f64> = world1.creatures.iter().map(|c| c.fitness).collect();
        let fitness2: Vec<f64> = world2.creatures.iter().map(|c| c.fitness).collect();
        assert_eq!(fitness1, fitness2);
    }

    #[test]
    fn test_checkpoint_roundtrip_continues_stream() {
        let config = test_config();
        let mut world = World::new_with_seed(config, 12345).unwrap();
        world.run(5).unwrap();

        let checkpoint = world.create_checkpoint();
        let mut restored = World::from_checkpoint(checkpoint).unwrap();

        assert_eq!(restored.generation, world.generation);
        assert_eq!(restored.population(), world.population());
        assert_eq!(restored.seed(), world.seed());

        world.run(3).unwrap();
        restored.run(3).unwrap();
        assert_eq!(world.stats_history.success_series(), restored.stats_history.success_series());
    }

    #[test]
    fn test_restore_rejects_truncated_population() {
        let mut world = World::new_with_seed(test_config(), 6).unwrap();
        world.run(1).unwrap();

        let mut checkpoint = world.create_checkpoint();
        checkpoint.creatures.truncate(6);

        assert!(matches!(
            World::from_checkpoint(checkpoint),
            Err(ConfigError::PopulationMismatch { expected: 12, found: 6 })
        ));
    }

    #[test]
    fn test_restore_rejects_foreign_genome_shape() {
        let mut world = World::new_with_seed(test_config(), 7).unwrap();
        world.run(1).unwrap();

        // Same population, but the game now has three states
        let mut checkpoint = world.create_checkpoint();
        checkpoint.config.game.num_states = 3;
        checkpoint.config.game.state_dist = vec![0.2, 0.3, 0.5];

        match World::from_checkpoint(checkpoint) {
            Err(ConfigError::GenomeShape { role, expected, found, .. }) => {
                assert_eq!(role, Role::Sender);
                assert_eq!(expected, (3, 2));
                assert_eq!(found, (2, 2));
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("mismatched genomes were accepted"),
        }
    }

    #[test]
    fn test_restore_rejects_learner_shape() {
        let mut world = World::new_with_seed(test_config(), 8).unwrap();
        let mut checkpoint = world.create_checkpoint();

        let wide = Gene::from_values(ndarray::Array2::zeros((2, 4)), 0.0, 10.0).unwrap();
        checkpoint.creatures[3].learners.receiver = UrnLearner::new(&wide);

        assert!(matches!(
            World::from_checkpoint(checkpoint),
            Err(ConfigError::GenomeShape { id: 3, role: Role::Receiver, .. })
        ));

        // The untouched world still steps
        assert!(world.step().is_ok());
    }

    #[test]
    fn test_run_to_completion() {
        let mut config = test_config();
        config.population.generation_count = 4;
        let mut world = World::new_with_seed(config, 5).unwrap();

        world.run(1).unwrap();
        assert_eq!(world.remaining_generations(), 3);
        world.run_to_completion().unwrap();
        assert!(world.is_finished());
        assert_eq!(world.generation, 4);
    }

    #[test]
    fn test_pair_mut() {
        let mut items = [1, 2, 3, 4];
        let (a, b) = pair_mut(&mut items, 3, 1);
        std::mem::swap(a, b);
        assert_eq!(items, [1, 4, 3, 2]);
    }
}
