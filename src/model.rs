use std::collections::HashMap;

/// Aggregated statistics for one state-action pair
#[derive(Default, Debug, Clone)]
struct SaStats {
    /// Visit count per observed next state
    counts: HashMap<usize, u32>,
    /// Total number of observations
    visits: u32,
    /// Running mean of the immediate reward
    mean_reward: f32,
}

/// A maximum-likelihood model of an environment's dynamics, estimated
/// incrementally from observed transitions
///
/// For every `(state, action)` pair the model keeps a visit count per reached
/// next state and a running mean of the immediate reward. Nothing is ever
/// reset; the estimates sharpen for the lifetime of the model.
#[derive(Debug, Clone)]
pub struct TransitionModel {
    num_states: usize,
    num_actions: usize,
    stats: Vec<SaStats>,
}

impl TransitionModel {
    /// Initialize an empty model over the given state and action spaces
    pub fn new(num_states: usize, num_actions: usize) -> Self {
        Self {
            num_states,
            num_actions,
            stats: vec![SaStats::default(); num_states * num_actions],
        }
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    fn index(&self, state: usize, action: usize) -> usize {
        debug_assert!(state < self.num_states && action < self.num_actions);
        state * self.num_actions + action
    }

    /// Record one observed transition
    ///
    /// Increments the visit count for `(state, action) -> next_state` and
    /// folds `reward` into the running mean with an incremental update.
    pub fn record(&mut self, state: usize, action: usize, next_state: usize, reward: f32) {
        let i = self.index(state, action);
        let entry = &mut self.stats[i];
        *entry.counts.entry(next_state).or_insert(0) += 1;
        entry.visits += 1;
        entry.mean_reward += (reward - entry.mean_reward) / entry.visits as f32;
    }

    /// The empirical next-state distribution for `(state, action)`
    ///
    /// Yields `(next_state, probability)` pairs. The iterator is empty when
    /// the pair has never been observed; callers treat that as a zero-value
    /// continuation.
    pub fn transitions(
        &self,
        state: usize,
        action: usize,
    ) -> impl Iterator<Item = (usize, f32)> + '_ {
        let entry = &self.stats[self.index(state, action)];
        let total = entry.visits as f32;
        entry
            .counts
            .iter()
            .map(move |(&next, &count)| (next, count as f32 / total))
    }

    /// Running mean reward for `(state, action)`, or `None` if unobserved
    pub fn expected_reward(&self, state: usize, action: usize) -> Option<f32> {
        let entry = &self.stats[self.index(state, action)];
        (entry.visits > 0).then_some(entry.mean_reward)
    }

    /// Total number of observations for `(state, action)`
    pub fn visits(&self, state: usize, action: usize) -> u32 {
        self.stats[self.index(state, action)].visits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_reward_is_arithmetic_mean() {
        let mut model = TransitionModel::new(2, 1);
        let rewards = [1.0, 2.0, 4.0, -3.0, 0.5];
        for r in rewards {
            model.record(0, 0, 1, r);
        }
        let mean = rewards.iter().sum::<f32>() / rewards.len() as f32;
        let estimate = model.expected_reward(0, 0).unwrap();
        assert!((estimate - mean).abs() < 1e-6, "running mean drifted");
    }

    #[test]
    fn unobserved_pair_has_no_statistics() {
        let model = TransitionModel::new(3, 2);
        assert_eq!(model.expected_reward(1, 1), None);
        assert_eq!(model.visits(1, 1), 0);
        assert_eq!(model.transitions(1, 1).count(), 0);
    }

    #[test]
    fn transition_probabilities_match_counts() {
        let mut model = TransitionModel::new(4, 1);
        model.record(0, 0, 1, 0.0);
        model.record(0, 0, 1, 0.0);
        model.record(0, 0, 2, 0.0);
        model.record(0, 0, 3, 0.0);

        let probs: HashMap<usize, f32> = model.transitions(0, 0).collect();
        assert_eq!(probs[&1], 0.5);
        assert_eq!(probs[&2], 0.25);
        assert_eq!(probs[&3], 0.25);

        let total: f32 = probs.values().sum();
        assert!((total - 1.0).abs() < 1e-6, "distribution must sum to 1");
    }

    #[test]
    fn pairs_accumulate_independently() {
        let mut model = TransitionModel::new(2, 2);
        model.record(0, 0, 1, 1.0);
        model.record(0, 1, 1, -1.0);
        assert_eq!(model.expected_reward(0, 0), Some(1.0));
        assert_eq!(model.expected_reward(0, 1), Some(-1.0));
        assert_eq!(model.visits(1, 0), 0);
    }
}
