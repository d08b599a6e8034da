//! Statistics tracking for the evolution loop.
//!
//! One [`Stats`] snapshot is produced per generation. The scalars here are
//! the whole telemetry surface: anything that plots or dashboards consumes
//! the [`StatsHistory`] series.

use crate::creature::{Creature, CreatureId};
use crate::role::{Role, RoleMap};
use serde::{Deserialize, Serialize};

/// Running mean
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Mean {
    pub sum: f64,
    pub count: u64,
}

impl Mean {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Per-episode accumulators for one generation
#[derive(Clone, Debug, Default)]
pub struct GenerationTally {
    pub episodes: u64,
    pub successes: u64,
    /// Urn reward handed out, per role
    pub reward: RoleMap<f64>,
    /// Innate bias of the choice taken, on successful episodes
    pub bias_on_success: RoleMap<Mean>,
    /// Innate bias of the choice taken, on failed episodes
    pub bias_on_failure: RoleMap<Mean>,
}

impl GenerationTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_episode(&mut self, success: bool) {
        self.episodes += 1;
        if success {
            self.successes += 1;
        }
    }

    /// Record one role's share of an episode
    pub fn record_role(&mut self, role: Role, success: bool, reward: f64, bias: f64) {
        self.reward[role] += reward;
        if success {
            self.bias_on_success[role].push(bias);
        } else {
            self.bias_on_failure[role].push(bias);
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.episodes == 0 {
            0.0
        } else {
            self.successes as f64 / self.episodes as f64
        }
    }

    /// Mean bias on success minus mean bias on failure; `None` when either
    /// side saw no episodes
    pub fn bias_gap(&self, role: Role) -> Option<f64> {
        let success = self.bias_on_success[role].value()?;
        let failure = self.bias_on_failure[role].value()?;
        Some(success - failure)
    }
}

/// Statistics snapshot for one generation
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Generation these episodes belong to
    pub generation: u32,
    /// Population count
    pub population: usize,
    /// Episodes played this generation
    pub episodes: u64,
    /// Fraction of episodes where the receiver matched the state
    pub success_rate: f64,
    /// Fitness across the population, before replacement
    pub fitness_mean: f64,
    pub fitness_variance: f64,
    pub fitness_max: f64,
    /// Mean urn reward per episode, per role
    pub mean_reward: RoleMap<f64>,
    /// Mean innate bias on success minus on failure, per role
    pub bias_gap: RoleMap<Option<f64>>,
    /// Mean age in generations
    pub age_mean: f64,
    /// Creatures bred at the end of this generation
    pub offspring: usize,
    /// Creatures carried over into the next generation
    pub survivors: usize,
    /// Fittest creature this generation
    pub fittest_id: Option<CreatureId>,
}

impl Stats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats from the population that just played `tally`
    pub fn update(&mut self, generation: u32, creatures: &[Creature], tally: &GenerationTally) {
        self.generation = generation;
        self.population = creatures.len();
        self.episodes = tally.episodes;
        self.success_rate = tally.success_rate();
        self.mean_reward = RoleMap::from_fn(|role| {
            if tally.episodes == 0 {
                0.0
            } else {
                tally.reward[role] / tally.episodes as f64
            }
        });
        self.bias_gap = RoleMap::from_fn(|role| tally.bias_gap(role));

        if creatures.is_empty() {
            self.fitness_mean = 0.0;
            self.fitness_variance = 0.0;
            self.fitness_max = 0.0;
            self.age_mean = 0.0;
            self.fittest_id = None;
            return;
        }

        let n = creatures.len() as f64;
        self.fitness_mean = creatures.iter().map(|c| c.fitness).sum::<f64>() / n;
        self.fitness_variance = creatures
            .iter()
            .map(|c| (c.fitness - self.fitness_mean).powi(2))
            .sum::<f64>()
            / n;

        let fittest = fittest(creatures);
        self.fitness_max = fittest.map(|c| c.fitness).unwrap_or(0.0);
        self.fittest_id = fittest.map(|c| c.id);

        self.age_mean = creatures
            .iter()
            .map(|c| generation.saturating_sub(c.generation) as f64)
            .sum::<f64>()
            / n;
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        let gap = |g: Option<f64>| g.map_or_else(|| "-".to_string(), |g| format!("{:+.2}", g));
        format!(
            "Gen:{:5} | Pop:{:4} | Succ:{:.3} | Fit:{:.2}±{:.2} max {:.1} | Rwd S/R:{:.2}/{:.2} | Gap S/R:{}/{} | Born:{:3}",
            self.generation,
            self.population,
            self.success_rate,
            self.fitness_mean,
            self.fitness_variance.sqrt(),
            self.fitness_max,
            self.mean_reward.sender,
            self.mean_reward.receiver,
            gap(self.bias_gap.sender),
            gap(self.bias_gap.receiver),
            self.offspring,
        )
    }
}

/// Highest-fitness creature; the first one wins ties
pub fn fittest(creatures: &[Creature]) -> Option<&Creature> {
    creatures.iter().reduce(|best, c| if c.fitness > best.fitness { c } else { best })
}

/// Historical statistics tracker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    /// All recorded stats snapshots, one per generation
    pub snapshots: Vec<Stats>,
}

impl StatsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stats snapshot
    pub fn record(&mut self, stats: Stats) {
        self.snapshots.push(stats);
    }

    /// Stats for a given generation
    pub fn get(&self, generation: u32) -> Option<&Stats> {
        self.snapshots.iter().find(|s| s.generation == generation)
    }

    pub fn latest(&self) -> Option<&Stats> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Success rate over generations
    pub fn success_series(&self) -> Vec<(u32, f64)> {
        self.snapshots
            .iter()
            .map(|s| (s.generation, s.success_rate))
            .collect()
    }

    /// Mean fitness over generations
    pub fn fitness_series(&self) -> Vec<(u32, f64)> {
        self.snapshots
            .iter()
            .map(|s| (s.generation, s.fitness_mean))
            .collect()
    }

    /// Bias gap for one role, skipping generations where it is undefined
    pub fn bias_gap_series(&self, role: Role) -> Vec<(u32, f64)> {
        self.snapshots
            .iter()
            .filter_map(|s| s.bias_gap[role].map(|g| (s.generation, g)))
            .collect()
    }

    /// Save history to file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
    }

    /// Load history from file
    pub fn load(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::creature::Lifespan;
    use crate::genetics::GenomeTemplate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn creatures(fitness: &[f64]) -> Vec<Creature> {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let template = GenomeTemplate::from_config(&Config::default());
        let lifespan = Lifespan::new(2.0).unwrap();
        fitness
            .iter()
            .enumerate()
            .map(|(i, &f)| {
                let mut c = Creature::new(i as u64, 0, template.spawn(&mut rng).unwrap(), &lifespan, &mut rng);
                c.fitness = f;
                c
            })
            .collect()
    }

    #[test]
    fn test_tally_rates_and_gap() {
        let mut tally = GenerationTally::new();
        tally.record_episode(true);
        tally.record_role(Role::Sender, true, 1.0, 4.0);
        tally.record_episode(false);
        tally.record_role(Role::Sender, false, 0.0, 1.0);
        tally.record_episode(true);
        tally.record_role(Role::Sender, true, 1.0, 2.0);

        assert!((tally.success_rate() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(tally.bias_gap(Role::Sender), Some(2.0));
        assert_eq!(tally.bias_gap(Role::Receiver), None);
    }

    #[test]
    fn test_stats_update() {
        let population = creatures(&[1.0, 2.0, 3.0, 6.0]);
        let mut tally = GenerationTally::new();
        for success in [true, false, true, true] {
            tally.record_episode(success);
            for role in Role::ALL {
                tally.record_role(role, success, if success { 0.5 } else { 0.0 }, 0.0);
            }
        }

        let mut stats = Stats::new();
        stats.update(3, &population, &tally);

        assert_eq!(stats.population, 4);
        assert_eq!(stats.generation, 3);
        assert!((stats.success_rate - 0.75).abs() < 1e-12);
        assert!((stats.fitness_mean - 3.0).abs() < 1e-12);
        assert!((stats.fitness_variance - 3.5).abs() < 1e-12);
        assert_eq!(stats.fitness_max, 6.0);
        assert_eq!(stats.fittest_id, Some(3));
        assert!((stats.mean_reward.sender - 0.375).abs() < 1e-12);
        assert!((stats.age_mean - 3.0).abs() < 1e-12);
        assert!(stats.summary().contains("Gen:    3"));
    }

    #[test]
    fn test_fittest_first_wins_ties() {
        let population = creatures(&[2.0, 5.0, 5.0]);
        assert_eq!(fittest(&population).map(|c| c.id), Some(1));
        assert!(fittest(&[]).is_none());
    }

    #[test]
    fn test_stats_history() {
        let mut history = StatsHistory::new();

        for i in 0..5 {
            let mut stats = Stats::new();
            stats.generation = i;
            stats.success_rate = i as f64 / 10.0;
            stats.bias_gap.sender = (i % 2 == 0).then_some(1.0);
            history.record(stats);
        }

        let series = history.success_series();
        assert_eq!(series.len(), 5);
        assert_eq!(series[4], (4, 0.4));
        assert_eq!(history.bias_gap_series(Role::Sender).len(), 3);
        assert_eq!(history.get(2).map(|s| s.generation), Some(2));
    }

    #[test]
    fn test_history_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let path = path.to_str().unwrap();

        let mut history = StatsHistory::new();
        let mut stats = Stats::new();
        stats.bias_gap.receiver = Some(-0.5);
        history.record(stats);
        history.save(path).unwrap();

        let loaded = StatsHistory::load(path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.snapshots[0].bias_gap.receiver, Some(-0.5));
        assert_eq!(loaded.snapshots[0].bias_gap.sender, None);
    }
}
