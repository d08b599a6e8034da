//! Matching distributions: who a sender plays with.
//!
//! Matching is positional. Each population slot has a fixed distribution
//! over receiver slots; an offspring inherits the distribution of the slot
//! it fills.

use crate::error::ConfigError;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Matching bias configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchingBias {
    /// Every slot is an equally likely receiver
    Uniform,
    /// Slots are split into contiguous, balanced groups; receivers come
    /// from the sender's own group
    Group { groups: usize },
}

impl Default for MatchingBias {
    fn default() -> Self {
        MatchingBias::Uniform
    }
}

fn group_index(bias: MatchingBias, population_size: usize, slot: usize) -> usize {
    match bias {
        MatchingBias::Uniform => 0,
        MatchingBias::Group { groups } => slot * groups / population_size,
    }
}

/// Precomputed per-slot receiver distributions
#[derive(Debug, Clone)]
pub struct Matching {
    bias: MatchingBias,
    population_size: usize,
    allow_self_pairing: bool,
    receivers: Vec<WeightedIndex<f64>>,
}

impl Matching {
    pub fn new(bias: MatchingBias, population_size: usize, allow_self_pairing: bool) -> Result<Self, ConfigError> {
        if population_size == 0 {
            return Err(ConfigError::Zero("population size"));
        }
        if let MatchingBias::Group { groups } = bias {
            if groups == 0 || groups > population_size {
                return Err(ConfigError::InvalidGroups {
                    groups,
                    population: population_size,
                });
            }
        }

        let receivers = (0..population_size)
            .map(|sender| {
                let weights = Self::weights_for(bias, population_size, allow_self_pairing, sender);
                WeightedIndex::new(&weights).map_err(|_| ConfigError::NoPartner(sender))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            bias,
            population_size,
            allow_self_pairing,
            receivers,
        })
    }

    /// Group index of a slot (always 0 for uniform matching)
    pub fn group_of(&self, slot: usize) -> usize {
        group_index(self.bias, self.population_size, slot)
    }

    /// Unnormalised receiver weights for `sender`
    pub fn weights(&self, sender: usize) -> Vec<f64> {
        Self::weights_for(self.bias, self.population_size, self.allow_self_pairing, sender)
    }

    /// Draw a sender uniformly from the population
    pub fn sample_sender<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.gen_range(0..self.population_size)
    }

    /// Draw a receiver from `sender`'s matching distribution
    pub fn sample_receiver<R: Rng + ?Sized>(&self, sender: usize, rng: &mut R) -> usize {
        self.receivers[sender].sample(rng)
    }

    pub fn population_size(&self) -> usize {
        self.population_size
    }

    fn weights_for(bias: MatchingBias, population_size: usize, allow_self_pairing: bool, sender: usize) -> Vec<f64> {
        let sender_group = group_index(bias, population_size, sender);
        (0..population_size)
            .map(|receiver| {
                let same_group = group_index(bias, population_size, receiver) == sender_group;
                let allowed = allow_self_pairing || receiver != sender;
                if same_group && allowed {
                    1.0
                } else {
                    0.0
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_uniform_covers_everyone() {
        let matching = Matching::new(MatchingBias::Uniform, 5, true).unwrap();
        assert_eq!(matching.weights(2), vec![1.0; 5]);

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut seen = [false; 5];
        for _ in 0..500 {
            seen[matching.sample_receiver(2, &mut rng)] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_self_pairing_excluded() {
        let matching = Matching::new(MatchingBias::Uniform, 4, false).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..500 {
            let sender = matching.sample_sender(&mut rng);
            assert_ne!(matching.sample_receiver(sender, &mut rng), sender);
        }
    }

    #[test]
    fn test_groups_are_contiguous_and_closed() {
        let matching = Matching::new(MatchingBias::Group { groups: 2 }, 6, true).unwrap();
        let groups: Vec<usize> = (0..6).map(|slot| matching.group_of(slot)).collect();
        assert_eq!(groups, vec![0, 0, 0, 1, 1, 1]);

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..500 {
            let sender = matching.sample_sender(&mut rng);
            let receiver = matching.sample_receiver(sender, &mut rng);
            assert_eq!(matching.group_of(sender), matching.group_of(receiver));
        }
    }

    #[test]
    fn test_invalid_groups() {
        assert!(matches!(
            Matching::new(MatchingBias::Group { groups: 0 }, 4, true),
            Err(ConfigError::InvalidGroups { .. })
        ));
        assert!(matches!(
            Matching::new(MatchingBias::Group { groups: 5 }, 4, true),
            Err(ConfigError::InvalidGroups { .. })
        ));
    }

    #[test]
    fn test_singleton_group_without_self_pairing() {
        // Four groups over four slots leaves nobody to talk to
        assert!(matches!(
            Matching::new(MatchingBias::Group { groups: 4 }, 4, false),
            Err(ConfigError::NoPartner(0))
        ));
        assert!(matches!(
            Matching::new(MatchingBias::Uniform, 1, false),
            Err(ConfigError::NoPartner(0))
        ));
    }

    #[test]
    fn test_yaml_forms() {
        let uniform: MatchingBias = serde_yaml::from_str("kind: uniform").unwrap();
        assert_eq!(uniform, MatchingBias::Uniform);

        let group: MatchingBias = serde_yaml::from_str("kind: group\ngroups: 3").unwrap();
        assert_eq!(group, MatchingBias::Group { groups: 3 });
    }
}
