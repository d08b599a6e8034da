//! Two-role signaling game.
//!
//! One episode is exactly two turns: the sender sees the hidden state and
//! emits a message, the receiver sees the message and guesses the state.
//! The outcome is read from [`SignalingGame::success`] once the episode is
//! done.

use crate::error::{ConfigError, ProtocolViolation};
use crate::role::Role;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Tolerance for a probability vector summing to one
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// Check that `dist` is a categorical distribution over `len` outcomes
pub fn validate_distribution(dist: &[f64], len: usize) -> Result<(), ConfigError> {
    if dist.len() != len {
        return Err(ConfigError::DistributionLength {
            expected: len,
            found: dist.len(),
        });
    }
    for (index, &value) in dist.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::InvalidProbability { index, value });
        }
    }
    let sum: f64 = dist.iter().sum();
    if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
        return Err(ConfigError::DistributionSum(sum));
    }
    Ok(())
}

/// Episode state of the signaling game
#[derive(Debug, Clone)]
pub struct SignalingGame {
    num_states: usize,
    num_messages: usize,
    state_dist: WeightedIndex<f64>,

    state: Option<usize>,
    message: Option<usize>,
    action: Option<usize>,
    success: bool,
    turn: Role,
    done: bool,
}

impl SignalingGame {
    /// Create a game; call [`reset`](Self::reset) before the first episode
    pub fn new(num_states: usize, num_messages: usize, state_dist: &[f64]) -> Result<Self, ConfigError> {
        if num_states == 0 {
            return Err(ConfigError::Zero("num_states"));
        }
        if num_messages == 0 {
            return Err(ConfigError::Zero("num_messages"));
        }
        validate_distribution(state_dist, num_states)?;
        let state_dist = WeightedIndex::new(state_dist).map_err(|_| ConfigError::DistributionSum(0.0))?;

        Ok(Self {
            num_states,
            num_messages,
            state_dist,
            state: None,
            message: None,
            action: None,
            success: false,
            turn: Role::Sender,
            done: false,
        })
    }

    /// Start a new episode with a freshly drawn hidden state
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.state = Some(self.state_dist.sample(rng));
        self.message = None;
        self.action = None;
        self.success = false;
        self.turn = Role::Sender;
        self.done = false;
    }

    /// What `role` sees: the hidden state for the sender, the message for
    /// the receiver
    pub fn observe(&self, role: Role) -> Result<usize, ProtocolViolation> {
        let state = self.state.ok_or(ProtocolViolation::NotStarted)?;
        match role {
            Role::Sender => Ok(state),
            Role::Receiver => self.message.ok_or(ProtocolViolation::NoMessage),
        }
    }

    /// Apply the acting role's decision
    pub fn step(&mut self, action: usize) -> Result<(), ProtocolViolation> {
        let state = self.state.ok_or(ProtocolViolation::NotStarted)?;
        if self.done {
            return Err(ProtocolViolation::EpisodeFinished);
        }

        match self.turn {
            Role::Sender => {
                if action >= self.num_messages {
                    return Err(ProtocolViolation::ActionOutOfRange {
                        role: Role::Sender,
                        action,
                        limit: self.num_messages,
                    });
                }
                self.message = Some(action);
                self.turn = Role::Receiver;
            }
            Role::Receiver => {
                if action >= self.num_states {
                    return Err(ProtocolViolation::ActionOutOfRange {
                        role: Role::Receiver,
                        action,
                        limit: self.num_states,
                    });
                }
                self.action = Some(action);
                self.success = action == state;
                self.done = true;
            }
        }

        Ok(())
    }

    /// Whether the receiver matched the hidden state (false until done)
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Role expected to act next
    pub fn turn(&self) -> Role {
        self.turn
    }

    pub fn state(&self) -> Option<usize> {
        self.state
    }

    pub fn message(&self) -> Option<usize> {
        self.message
    }

    pub fn action(&self) -> Option<usize> {
        self.action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn game() -> SignalingGame {
        SignalingGame::new(3, 2, &[0.2, 0.3, 0.5]).unwrap()
    }

    #[test]
    fn test_full_episode() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut env = game();
        env.reset(&mut rng);

        let state = env.observe(Role::Sender).unwrap();
        assert!(state < 3);
        assert_eq!(env.turn(), Role::Sender);

        env.step(1).unwrap();
        assert_eq!(env.turn(), Role::Receiver);
        assert_eq!(env.observe(Role::Receiver), Ok(1));
        assert!(!env.is_done());

        env.step(state).unwrap();
        assert!(env.is_done());
        assert!(env.success());
    }

    #[test]
    fn test_wrong_guess_fails() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut env = game();
        env.reset(&mut rng);

        let state = env.observe(Role::Sender).unwrap();
        env.step(0).unwrap();
        env.step((state + 1) % 3).unwrap();
        assert!(env.is_done());
        assert!(!env.success());
    }

    #[test]
    fn test_step_after_done_is_violation() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut env = game();
        env.reset(&mut rng);
        env.step(0).unwrap();
        env.step(0).unwrap();

        assert_eq!(env.step(0), Err(ProtocolViolation::EpisodeFinished));

        // Reset makes it playable again
        env.reset(&mut rng);
        assert!(env.step(0).is_ok());
    }

    #[test]
    fn test_receiver_observed_before_message() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut env = game();
        assert_eq!(env.observe(Role::Sender), Err(ProtocolViolation::NotStarted));

        env.reset(&mut rng);
        assert_eq!(env.observe(Role::Receiver), Err(ProtocolViolation::NoMessage));
    }

    #[test]
    fn test_action_range_checked() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut env = game();
        env.reset(&mut rng);

        assert!(matches!(
            env.step(2),
            Err(ProtocolViolation::ActionOutOfRange { role: Role::Sender, .. })
        ));
        env.step(1).unwrap();
        assert!(matches!(
            env.step(3),
            Err(ProtocolViolation::ActionOutOfRange { role: Role::Receiver, .. })
        ));
    }

    #[test]
    fn test_state_distribution_respected() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut env = SignalingGame::new(3, 3, &[0.0, 1.0, 0.0]).unwrap();
        for _ in 0..100 {
            env.reset(&mut rng);
            assert_eq!(env.observe(Role::Sender), Ok(1));
        }
    }

    #[test]
    fn test_invalid_distribution_rejected() {
        assert!(matches!(
            SignalingGame::new(2, 2, &[0.5]),
            Err(ConfigError::DistributionLength { expected: 2, found: 1 })
        ));
        assert!(matches!(
            SignalingGame::new(2, 2, &[0.5, 0.6]),
            Err(ConfigError::DistributionSum(_))
        ));
        assert!(matches!(
            SignalingGame::new(2, 2, &[1.5, -0.5]),
            Err(ConfigError::InvalidProbability { index: 1, .. })
        ));
        assert!(matches!(SignalingGame::new(0, 2, &[]), Err(ConfigError::Zero("num_states"))));
    }
}
