//! Evolution mechanics: lifespan turnover and tournament selection.

use crate::config::Config;
use crate::creature::{Creature, CreatureId, Lifespan};
use crate::error::{ConfigError, ProtocolViolation};
use crate::genetics::{crossover_genomes, mutate_genome};
use rand::seq::index;
use rand::Rng;

/// Outcome of one generational replacement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replacement {
    /// Creatures carried over with one generation less to live
    pub survivors: usize,
    /// Slots filled with freshly bred creatures
    pub offspring: usize,
}

/// Evolution engine for managing population genetics
#[derive(Debug, Clone)]
pub struct EvolutionEngine {
    pub tournament_size: usize,
    pub crossover_enabled: bool,
    pub mutation_rate: f64,
    pub reset_fitness_on_carry_over: bool,
    pub lifespan: Lifespan,
}

impl EvolutionEngine {
    /// Create evolution engine from config
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            tournament_size: config.genetics.tournament_size,
            crossover_enabled: config.genetics.crossover_enabled,
            mutation_rate: config.genetics.mutation_rate,
            reset_fitness_on_carry_over: config.population.reset_fitness_on_carry_over,
            lifespan: Lifespan::new(config.population.lifespan_mean)?,
        })
    }

    /// Sample `tournament_size` distinct creatures and return their indices,
    /// fittest first. Ties keep sampling order.
    pub fn tournament<R: Rng + ?Sized>(&self, population: &[Creature], rng: &mut R) -> Vec<usize> {
        let size = self.tournament_size.min(population.len());
        let mut entrants = index::sample(rng, population.len(), size).into_vec();

        entrants.sort_by(|&a, &b| {
            population[b]
                .fitness
                .partial_cmp(&population[a].fitness)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        entrants
    }

    /// Breed one offspring from a tournament over `population`
    pub fn breed<R: Rng + ?Sized>(
        &self,
        population: &[Creature],
        id: CreatureId,
        generation: u32,
        rng: &mut R,
    ) -> Result<Creature, ProtocolViolation> {
        let entrants = self.tournament(population, rng);

        let (mut genes, parent1, parent2) = match entrants.as_slice() {
            [first, second, ..] if self.crossover_enabled => {
                let (a, b) = (&population[*first], &population[*second]);
                (crossover_genomes(&a.genes, &b.genes, rng)?, a.id, Some(b.id))
            }
            [first, ..] => {
                let winner = &population[*first];
                (winner.genes.clone(), winner.id, None)
            }
            [] => return Err(ProtocolViolation::EmptyTournament),
        };

        mutate_genome(&mut genes, self.mutation_rate, rng);

        Ok(Creature::new(id, generation, genes, &self.lifespan, rng).with_parents(parent1, parent2))
    }

    /// Build the next population.
    ///
    /// Creatures with more than one generation left are carried over with
    /// their lifespan decremented; every other slot is refilled by
    /// [`breed`](Self::breed), selecting from the population as it was
    /// before any replacement.
    pub fn next_generation<R: Rng + ?Sized>(
        &self,
        population: &[Creature],
        next_id: &mut CreatureId,
        generation: u32,
        rng: &mut R,
    ) -> Result<(Vec<Creature>, Replacement), ProtocolViolation> {
        let mut next = Vec::with_capacity(population.len());
        let mut replacement = Replacement::default();

        for creature in population {
            if creature.is_expiring() {
                let child = self.breed(population, *next_id, generation, rng)?;
                log::trace!(
                    "slot {} -> creature {} (parents {:?}/{:?})",
                    next.len(),
                    child.id,
                    child.parent1_id,
                    child.parent2_id
                );
                *next_id += 1;
                next.push(child);
                replacement.offspring += 1;
            } else {
                let mut survivor = creature.clone();
                survivor.lifespan -= 1;
                if self.reset_fitness_on_carry_over {
                    survivor.fitness = 0.0;
                }
                next.push(survivor);
                replacement.survivors += 1;
            }
        }

        Ok((next, replacement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetics::GenomeTemplate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn population(config: &Config, rng: &mut ChaCha8Rng) -> Vec<Creature> {
        let template = GenomeTemplate::from_config(config);
        let lifespan = Lifespan::new(config.population.lifespan_mean).unwrap();
        (0..config.population.size)
            .map(|i| {
                let mut c = Creature::new(i as u64, 0, template.spawn(rng).unwrap(), &lifespan, rng);
                c.fitness = i as f64;
                c
            })
            .collect()
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.population.size = 10;
        config.genetics.tournament_size = 4;
        config
    }

    #[test]
    fn test_tournament_distinct_and_sorted() {
        let config = test_config();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let engine = EvolutionEngine::from_config(&config).unwrap();
        let pop = population(&config, &mut rng);

        for _ in 0..50 {
            let entrants = engine.tournament(&pop, &mut rng);
            assert_eq!(entrants.len(), 4);

            let mut unique = entrants.clone();
            unique.sort_unstable();
            unique.dedup();
            assert_eq!(unique.len(), 4);

            assert!(entrants.windows(2).all(|w| pop[w[0]].fitness >= pop[w[1]].fitness));
        }
    }

    #[test]
    fn test_crossover_uses_top_two() {
        let mut config = test_config();
        config.genetics.tournament_size = 10;
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let engine = EvolutionEngine::from_config(&config).unwrap();
        let pop = population(&config, &mut rng);

        let child = engine.breed(&pop, 100, 1, &mut rng).unwrap();
        assert_eq!(child.parent1_id, Some(9));
        assert_eq!(child.parent2_id, Some(8));
        assert_eq!(child.fitness, 0.0);
        assert_eq!(child.generation, 1);
    }

    #[test]
    fn test_clone_path_copies_genes() {
        let mut config = test_config();
        config.genetics.tournament_size = 10;
        config.genetics.crossover_enabled = false;
        config.genetics.mutation_rate = 0.0;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let engine = EvolutionEngine::from_config(&config).unwrap();
        let pop = population(&config, &mut rng);

        let child = engine.breed(&pop, 100, 1, &mut rng).unwrap();
        assert_eq!(child.parent1_id, Some(9));
        assert_eq!(child.parent2_id, None);
        assert_eq!(child.genes, pop[9].genes);
    }

    #[test]
    fn test_next_generation_turnover() {
        let config = test_config();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let engine = EvolutionEngine::from_config(&config).unwrap();
        let mut pop = population(&config, &mut rng);
        for (i, c) in pop.iter_mut().enumerate() {
            c.lifespan = if i % 2 == 0 { 1 } else { 3 };
        }

        let mut next_id = 10;
        let (next, replacement) = engine.next_generation(&pop, &mut next_id, 1, &mut rng).unwrap();

        assert_eq!(next.len(), pop.len());
        assert_eq!(replacement, Replacement { survivors: 5, offspring: 5 });
        assert_eq!(next_id, 15);

        for (old, new) in pop.iter().zip(&next) {
            if old.lifespan == 1 {
                assert!(new.id >= 10);
                assert!(new.is_offspring());
            } else {
                assert_eq!(new.id, old.id);
                assert_eq!(new.lifespan, 2);
                assert_eq!(new.fitness, old.fitness);
            }
        }
    }

    #[test]
    fn test_carry_over_fitness_reset_option() {
        let mut config = test_config();
        config.population.reset_fitness_on_carry_over = true;
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let engine = EvolutionEngine::from_config(&config).unwrap();
        let mut pop = population(&config, &mut rng);
        for c in pop.iter_mut() {
            c.lifespan = 2;
        }

        let mut next_id = 10;
        let (next, _) = engine.next_generation(&pop, &mut next_id, 1, &mut rng).unwrap();
        assert!(next.iter().all(|c| c.fitness == 0.0 && c.lifespan == 1));
    }
}
