//! Pólya-urn learner.
//!
//! Each observation owns a row of ball counts, one per choice. A decision
//! draws a ball with probability proportional to its count; reward adds
//! balls of the drawn colour, so rewarded choices become more likely.
//!
//! Decisions are buffered with their reward and only folded into the
//! counts by [`UrnLearner::train`], which lets the sender be credited after
//! the receiver has acted.

use crate::error::ProtocolViolation;
use crate::genetics::Gene;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A decision awaiting training
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub observation: usize,
    pub choice: usize,
    pub reward: f64,
}

/// Urn-based adaptive policy for one role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrnLearner {
    counts: Array2<f64>,
    /// Row totals of `counts`, kept in step with every update
    sums: Array1<f64>,
    buffer: Vec<Experience>,
}

impl UrnLearner {
    /// One ball per choice plus the innate bias from `gene`
    pub fn new(gene: &Gene) -> Self {
        let counts = gene.values().mapv(|bias| 1.0 + bias);
        let sums = counts.sum_axis(Axis(1));
        Self {
            counts,
            sums,
            buffer: Vec::new(),
        }
    }

    pub fn num_observations(&self) -> usize {
        self.counts.nrows()
    }

    pub fn num_choices(&self) -> usize {
        self.counts.ncols()
    }

    /// Draw a choice for `observation` proportionally to its ball counts
    pub fn get_action<R: Rng + ?Sized>(&self, observation: usize, rng: &mut R) -> Result<usize, ProtocolViolation> {
        self.check_observation(observation)?;

        let row = self.counts.row(observation);
        let mut ball = rng.gen::<f64>() * self.sums[observation];
        for (choice, &count) in row.iter().enumerate() {
            if ball < count {
                return Ok(choice);
            }
            ball -= count;
        }

        // Rounding left the draw just past the last ball
        Ok(row
            .iter()
            .rposition(|&count| count > 0.0)
            .unwrap_or(row.len() - 1))
    }

    /// Queue a decision with zero reward
    pub fn store_buffer(&mut self, observation: usize, choice: usize) -> Result<(), ProtocolViolation> {
        self.check_observation(observation)?;
        if choice >= self.num_choices() {
            return Err(ProtocolViolation::ChoiceOutOfRange {
                choice,
                limit: self.num_choices(),
            });
        }
        self.buffer.push(Experience {
            observation,
            choice,
            reward: 0.0,
        });
        Ok(())
    }

    /// Credit the most recent decision; no-op with an empty buffer
    pub fn update_reward(&mut self, delta: f64) {
        if let Some(last) = self.buffer.last_mut() {
            last.reward += delta;
        }
    }

    /// Fold every buffered reward into the urns and clear the buffer.
    /// Returns the number of decisions consumed.
    pub fn train(&mut self) -> usize {
        let drained = self.buffer.len();
        for exp in self.buffer.drain(..) {
            self.counts[[exp.observation, exp.choice]] += exp.reward;
            self.sums[exp.observation] += exp.reward;
        }
        drained
    }

    /// Probability of drawing `choice` under `observation`
    pub fn probability(&self, observation: usize, choice: usize) -> f64 {
        match (self.counts.get((observation, choice)), self.sums.get(observation)) {
            (Some(&count), Some(&sum)) if sum > 0.0 => count / sum,
            _ => 0.0,
        }
    }

    /// Ball counts for one observation
    pub fn counts(&self, observation: usize) -> ArrayView1<'_, f64> {
        self.counts.row(observation)
    }

    /// Running total for one observation
    pub fn sum(&self, observation: usize) -> f64 {
        self.sums[observation]
    }

    pub fn pending(&self) -> &[Experience] {
        &self.buffer
    }

    /// Most likely choice per observation (lowest index on ties)
    pub fn greedy_mapping(&self) -> Vec<usize> {
        self.counts
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (choice, &count)| {
                        if count > best.1 {
                            (choice, count)
                        } else {
                            best
                        }
                    })
                    .0
            })
            .collect()
    }

    fn check_observation(&self, observation: usize) -> Result<(), ProtocolViolation> {
        if observation >= self.num_observations() {
            return Err(ProtocolViolation::ObservationOutOfRange {
                observation,
                limit: self.num_observations(),
            });
        }
        Ok(())
    }
}
