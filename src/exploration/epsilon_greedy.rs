use rand::{thread_rng, Rng};

use crate::decay::Decay;

use super::Choice;

/// Epsilon greedy exploration policy with time-decaying epsilon threshold
///
/// Explores with probability epsilon and exploits otherwise, where epsilon is
/// evaluated from the decay strategy at the current episode.
pub struct EpsilonGreedy<D: Decay> {
    epsilon: D,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy with a decay strategy
    pub fn new(decay: D) -> Self {
        Self { epsilon: decay }
    }

    /// Current epsilon threshold for `episode`
    pub fn epsilon(&self, episode: u32) -> f32 {
        self.epsilon.evaluate(episode as f32)
    }

    /// Invoke epsilon greedy policy for current episode
    pub fn choose(&self, episode: u32) -> Choice {
        self.choose_with(&mut thread_rng(), episode)
    }

    /// Invoke epsilon greedy policy with a caller-supplied rng
    pub fn choose_with<R: Rng + ?Sized>(&self, rng: &mut R, episode: u32) -> Choice {
        if rng.gen::<f32>() > self.epsilon(episode) {
            Choice::Exploit
        } else {
            Choice::Explore
        }
    }
}
