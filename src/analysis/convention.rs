//! Convention analysis: how well a sender and a receiver understand each
//! other right now.

use crate::urn::UrnLearner;
use serde::{Deserialize, Serialize};

/// Communicative profile of a sender/receiver pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Convention {
    /// Most likely message per state
    pub sender_map: Vec<usize>,
    /// Most likely guess per message
    pub receiver_map: Vec<usize>,
    /// Success probability when both sides sample from their urns
    pub expected_success: f64,
    /// Success probability when both sides play their most likely choice
    pub greedy_success: f64,
}

impl Convention {
    /// Analyse `sender` (state -> message) against `receiver`
    /// (message -> state) under the hidden-state distribution `state_dist`.
    pub fn analyze(sender: &UrnLearner, receiver: &UrnLearner, state_dist: &[f64]) -> Self {
        let sender_map = sender.greedy_mapping();
        let receiver_map = receiver.greedy_mapping();

        let mut expected_success = 0.0;
        let mut greedy_success = 0.0;
        for (state, &p_state) in state_dist.iter().enumerate().take(sender.num_observations()) {
            for message in 0..sender.num_choices().min(receiver.num_observations()) {
                expected_success +=
                    p_state * sender.probability(state, message) * receiver.probability(message, state);
            }
            let decoded = receiver_map.get(sender_map[state]).copied();
            if decoded == Some(state) {
                greedy_success += p_state;
            }
        }

        Self {
            sender_map,
            receiver_map,
            expected_success,
            greedy_success,
        }
    }

    /// Every state is sent on its own message and decoded back to itself
    pub fn is_signaling_system(&self) -> bool {
        self.sender_map
            .iter()
            .enumerate()
            .all(|(state, &message)| self.receiver_map.get(message) == Some(&state))
    }
}
