//! Human-readable dump of a creature's innate bias and learned urns.
//!
//! For inspection only; the layout is not a stable format.

use crate::analysis::convention::Convention;
use crate::creature::Creature;
use crate::role::Role;
use std::fmt;

/// Display adapter for a single creature
pub struct CreatureReport<'a> {
    creature: &'a Creature,
    state_dist: Option<&'a [f64]>,
}

impl<'a> CreatureReport<'a> {
    pub fn new(creature: &'a Creature) -> Self {
        Self {
            creature,
            state_dist: None,
        }
    }

    /// Include a convention summary computed under this state distribution
    pub fn with_state_dist(mut self, state_dist: &'a [f64]) -> Self {
        self.state_dist = Some(state_dist);
        self
    }
}

fn row(values: impl Iterator<Item = f64>, precision: usize) -> String {
    let cells: Vec<String> = values.map(|v| format!("{:.*}", precision, v)).collect();
    format!("[{}]", cells.join(", "))
}

impl fmt::Display for CreatureReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.creature;
        let parents = match (c.parent1_id, c.parent2_id) {
            (Some(a), Some(b)) => format!("{} x {}", a, b),
            (Some(a), None) => format!("{}", a),
            _ => "founder".to_string(),
        };
        writeln!(
            f,
            "Creature {} (born gen {}, parents {}) fitness {:.2}, {} generation(s) left",
            c.id, c.generation, parents, c.fitness, c.lifespan
        )?;

        for role in Role::ALL {
            let learner = &c.learners[role];
            let gene = &c.genes[role];
            let (obs_name, choice_name) = match role {
                Role::Sender => ("state", "message"),
                Role::Receiver => ("message", "state"),
            };
            writeln!(f, "  {} ({} -> {}), {} episodes", role, obs_name, choice_name, c.episodes[role])?;

            for obs in 0..learner.num_observations() {
                let probs = (0..learner.num_choices()).map(|choice| learner.probability(obs, choice));
                writeln!(
                    f,
                    "    {} {}: balls {} p {} bias {}",
                    obs_name,
                    obs,
                    row(learner.counts(obs).iter().copied(), 1),
                    row(probs, 2),
                    row(gene.values().row(obs).iter().copied(), 2),
                )?;
            }
        }

        if let Some(state_dist) = self.state_dist {
            let convention = Convention::analyze(&c.learners.sender, &c.learners.receiver, state_dist);
            writeln!(
                f,
                "  self-play success {:.3} (greedy {:.3}){}",
                convention.expected_success,
                convention.greedy_success,
                if convention.is_signaling_system() {
                    ", signaling system"
                } else {
                    ""
                }
            )?;
        }

        Ok(())
    }
}
