use rand::{thread_rng, Rng};

use crate::{
    assert_interval, decay,
    decay::Decay,
    env::{Environment, Outcome, Transition},
    error::Error,
    exploration::{Choice, EpsilonGreedy},
    model::TransitionModel,
};

/// Configuration for the [`AdpLearner`]
pub struct AdpLearnerConfig<D: Decay> {
    pub gamma: f32,
    pub exploration: EpsilonGreedy<D>,
    /// Convergence tolerance for policy evaluation
    pub tolerance: f32,
    /// Sweep cap for policy evaluation
    pub max_sweeps: u32,
}

impl Default for AdpLearnerConfig<decay::Geometric> {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            exploration: EpsilonGreedy::new(decay::Geometric::new(0.99, 1.0, 0.0).unwrap()),
            tolerance: 1e-4,
            max_sweeps: 10_000,
        }
    }
}

/// Summary statistics for one completed episode
#[derive(Debug, Default, Clone, Copy)]
pub struct EpisodeSummary {
    /// Total reward accumulated over the episode
    pub reward: f32,
    /// Number of environment steps taken
    pub steps: u32,
    /// Whether the episode ended in [`Outcome::Win`]
    pub won: bool,
}

/// An adaptive dynamic programming agent for finite MDPs
///
/// The learner maintains a maximum-likelihood [`TransitionModel`] of the
/// environment's dynamics and plans against it with policy evaluation and
/// policy improvement. Two update styles are supported:
///
/// - [`update_step`](Self::update_step) re-plans after every single observed
///   transition, so the policy is always consistent with the latest model.
///   This is expensive but is the canonical ADP update.
/// - [`percept`](Self::percept) only records the observation and defers
///   planning to [`policy_update`](Self::policy_update) at the episode
///   boundary, trading policy freshness for speed.
///
/// Value and policy tables are flat vectors indexed by state; the policy is
/// defined for every state from construction onward.
pub struct AdpLearner<D: Decay> {
    model: TransitionModel,
    values: Vec<f32>,
    policy: Vec<usize>,
    exploration: EpsilonGreedy<D>,
    gamma: f32,
    tolerance: f32,
    max_sweeps: u32,
    episode: u32,
}

impl<D: Decay> AdpLearner<D> {
    /// Initialize a new `AdpLearner` over the given state and action spaces
    ///
    /// **Panics** if `gamma` is not in the interval `[0,1]` or if either
    /// space is empty.
    pub fn new(num_states: usize, num_actions: usize, config: AdpLearnerConfig<D>) -> Self {
        assert_interval!(config.gamma, 0.0, 1.0);
        assert!(num_states > 0 && num_actions > 0);
        Self {
            model: TransitionModel::new(num_states, num_actions),
            values: vec![0.0; num_states],
            policy: vec![0; num_states],
            exploration: config.exploration,
            gamma: config.gamma,
            tolerance: config.tolerance,
            max_sweeps: config.max_sweeps,
            episode: 0,
        }
    }

    fn check_state(&self, state: usize) -> Result<(), Error> {
        let num_states = self.model.num_states();
        if state < num_states {
            Ok(())
        } else {
            Err(Error::InvalidState {
                index: state,
                num_states,
            })
        }
    }

    fn check_action(&self, action: usize) -> Result<(), Error> {
        let num_actions = self.model.num_actions();
        if action < num_actions {
            Ok(())
        } else {
            Err(Error::InvalidAction {
                index: action,
                num_actions,
            })
        }
    }

    /// The action-value of `(state, action)` under the current value table
    ///
    /// Unobserved pairs score the default: zero reward, zero continuation.
    fn q_value(&self, state: usize, action: usize) -> f32 {
        let reward = match self.model.expected_reward(state, action) {
            Some(r) => r,
            None => return 0.0,
        };
        let continuation: f32 = self
            .model
            .transitions(state, action)
            .map(|(next, prob)| prob * self.values[next])
            .sum();
        reward + self.gamma * continuation
    }

    /// Synchronous policy evaluation against the learned model
    ///
    /// Sweeps the Bellman expectation update over all states until the
    /// largest change falls below the tolerance or the sweep cap is hit.
    /// States whose policy action has never been observed keep their prior
    /// value. Hitting the cap is not an error; the best estimate so far is
    /// kept.
    fn evaluate_policy(&mut self) {
        for sweep in 0..self.max_sweeps {
            let mut next = self.values.clone();
            let mut delta = 0.0f32;
            for state in 0..self.values.len() {
                let action = self.policy[state];
                if self.model.visits(state, action) == 0 {
                    continue;
                }
                let value = self.q_value(state, action);
                delta = delta.max((value - self.values[state]).abs());
                next[state] = value;
            }
            self.values = next;
            if delta < self.tolerance {
                return;
            }
            if sweep + 1 == self.max_sweeps {
                log::warn!(
                    "policy evaluation stopped after {} sweeps with max delta {delta}",
                    self.max_sweeps,
                );
            }
        }
    }

    /// Greedy policy improvement against the current value table
    ///
    /// Ties break toward the lowest action index, so an unobserved action
    /// never displaces an observed one of equal value.
    fn improve_policy(&mut self) {
        for state in 0..self.policy.len() {
            let mut best_action = 0;
            let mut best_q = self.q_value(state, 0);
            for action in 1..self.model.num_actions() {
                let q = self.q_value(state, action);
                if q > best_q {
                    best_action = action;
                    best_q = q;
                }
            }
            self.policy[state] = best_action;
        }
    }

    fn plan(&mut self) {
        self.evaluate_policy();
        self.improve_policy();
    }

    /// Choose an action for `state` under the epsilon-greedy policy
    ///
    /// Explores (uniform over all actions) with probability epsilon,
    /// otherwise returns the greedy policy action.
    pub fn actuate(&self, state: usize) -> Result<usize, Error> {
        self.actuate_with(&mut thread_rng(), state)
    }

    /// [`actuate`](Self::actuate) with a caller-supplied rng
    pub fn actuate_with<R: Rng + ?Sized>(&self, rng: &mut R, state: usize) -> Result<usize, Error> {
        self.check_state(state)?;
        let action = match self.exploration.choose_with(rng, self.episode) {
            Choice::Explore => rng.gen_range(0..self.model.num_actions()),
            Choice::Exploit => self.policy[state],
        };
        Ok(action)
    }

    /// Record one observed transition without re-planning
    ///
    /// Planning is deferred to [`policy_update`](Self::policy_update), which
    /// must run before the next episode's first action.
    pub fn percept(&mut self, transition: &Transition) -> Result<(), Error> {
        self.check_state(transition.state)?;
        self.check_action(transition.action)?;
        self.check_state(transition.next_state)?;
        self.model.record(
            transition.state,
            transition.action,
            transition.next_state,
            transition.reward,
        );
        Ok(())
    }

    /// Record one observed transition and fully re-plan
    ///
    /// Runs policy evaluation and improvement against the updated model and
    /// returns the refreshed policy's action for the observed next state.
    /// Every call triggers a complete re-plan; that keeps the policy exactly
    /// consistent with the model at the cost of doing dynamic programming
    /// once per environment step.
    pub fn update_step(&mut self, transition: &Transition) -> Result<usize, Error> {
        self.percept(transition)?;
        self.plan();
        Ok(self.policy[transition.next_state])
    }

    /// Close out the current episode
    ///
    /// Runs one full evaluation and improvement pass, then advances the
    /// episode counter, which decays the exploration epsilon. Call exactly
    /// once per completed episode.
    pub fn policy_update(&mut self) {
        self.plan();
        self.episode += 1;
    }

    /// Run one full training episode in `env` starting from `start`
    ///
    /// Acts, observes, and records until a terminal outcome, then calls
    /// [`policy_update`](Self::policy_update).
    pub fn go<E: Environment>(&mut self, env: &mut E, start: usize) -> Result<EpisodeSummary, Error> {
        self.check_state(start)?;
        let mut state = start;
        let mut summary = EpisodeSummary::default();
        loop {
            let action = self.actuate(state)?;
            let transition = env.step(state, action)?;
            self.percept(&transition)?;
            summary.reward += transition.reward;
            summary.steps += 1;
            if transition.outcome.is_terminal() {
                summary.won = transition.outcome == Outcome::Win;
                break;
            }
            state = transition.next_state;
        }
        self.policy_update();
        Ok(summary)
    }

    /// The current value table
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// The current greedy policy
    pub fn policy(&self) -> &[usize] {
        &self.policy
    }

    /// The learned transition model
    pub fn model(&self) -> &TransitionModel {
        &self.model
    }

    /// The current exploration epsilon
    pub fn epsilon(&self) -> f32 {
        self.exploration.epsilon(self.episode)
    }

    /// Number of completed episodes
    pub fn episode(&self) -> u32 {
        self.episode
    }
}

#[cfg(test)]
mod tests {
    use crate::gym::{GridWorld, RewardTable};

    use super::*;

    fn greedy_learner(num_states: usize, num_actions: usize) -> AdpLearner<decay::Constant> {
        AdpLearner::new(
            num_states,
            num_actions,
            AdpLearnerConfig {
                gamma: 0.9,
                exploration: EpsilonGreedy::new(decay::Constant::new(0.0)),
                tolerance: 1e-4,
                max_sweeps: 1000,
            },
        )
    }

    fn step(s: usize, a: usize, next: usize, r: f32, outcome: Outcome) -> Transition {
        Transition {
            state: s,
            action: a,
            next_state: next,
            reward: r,
            outcome,
        }
    }

    #[test]
    fn policy_is_always_defined_and_in_range() {
        let mut learner = greedy_learner(5, 3);
        assert!(learner.policy().iter().all(|&a| a < 3));

        learner
            .percept(&step(0, 2, 1, 0.5, Outcome::Step))
            .unwrap();
        learner
            .percept(&step(1, 1, 4, 1.0, Outcome::Win))
            .unwrap();
        learner.policy_update();

        assert_eq!(learner.policy().len(), 5);
        assert!(learner.policy().iter().all(|&a| a < 3));
    }

    #[test]
    fn invalid_indices_are_rejected() {
        let mut learner = greedy_learner(3, 2);
        assert_eq!(
            learner.actuate(3),
            Err(Error::InvalidState {
                index: 3,
                num_states: 3
            })
        );
        assert_eq!(
            learner.percept(&step(0, 5, 1, 0.0, Outcome::Step)),
            Err(Error::InvalidAction {
                index: 5,
                num_actions: 2
            })
        );
        assert_eq!(
            learner.update_step(&step(0, 0, 9, 0.0, Outcome::Step)),
            Err(Error::InvalidState {
                index: 9,
                num_states: 3
            })
        );
    }

    #[test]
    fn percept_defers_planning_to_policy_update() {
        let mut learner = greedy_learner(2, 1);
        learner
            .percept(&step(0, 0, 1, 5.0, Outcome::Win))
            .unwrap();
        assert_eq!(learner.values()[0], 0.0);

        learner.policy_update();
        assert_eq!(learner.values()[0], 5.0);
    }

    #[test]
    fn terminal_absorption_ignores_gamma() {
        for gamma in [0.1, 0.5, 0.99] {
            let mut learner = AdpLearner::new(
                2,
                1,
                AdpLearnerConfig {
                    gamma,
                    exploration: EpsilonGreedy::new(decay::Constant::new(0.0)),
                    tolerance: 1e-4,
                    max_sweeps: 1000,
                },
            );
            for _ in 0..4 {
                learner
                    .percept(&step(0, 0, 1, 10.0, Outcome::Win))
                    .unwrap();
            }
            learner.policy_update();
            assert_eq!(learner.values()[0], 10.0);
            assert_eq!(learner.values()[1], 0.0);
        }
    }

    #[test]
    fn evaluation_converges_on_a_self_loop() {
        let mut learner = greedy_learner(1, 1);
        learner
            .percept(&step(0, 0, 0, -1.0, Outcome::Step))
            .unwrap();
        learner.policy_update();

        // fixed point of v = -1 + 0.9v
        assert!((learner.values()[0] + 10.0).abs() < 0.01);
    }

    #[test]
    fn evaluation_is_idempotent_without_new_observations() {
        let mut learner = greedy_learner(3, 2);
        learner
            .percept(&step(0, 0, 1, -0.1, Outcome::Step))
            .unwrap();
        learner
            .percept(&step(1, 0, 1, -0.1, Outcome::Step))
            .unwrap();
        learner
            .percept(&step(1, 1, 2, 1.0, Outcome::Win))
            .unwrap();
        learner.policy_update();

        let before = learner.values().to_vec();
        learner.policy_update();
        for (a, b) in before.iter().zip(learner.values()) {
            assert!((a - b).abs() <= 1e-4, "values drifted with no new data");
        }
    }

    #[test]
    fn update_step_returns_the_refreshed_policy_action() {
        let mut learner = greedy_learner(4, 2);
        // 0 -> 1 -> win(2), with a losing alternative 1 -> 3
        learner
            .update_step(&step(1, 1, 3, -1.0, Outcome::Lose))
            .unwrap();
        learner
            .update_step(&step(1, 0, 2, 1.0, Outcome::Win))
            .unwrap();
        let next = learner
            .update_step(&step(0, 0, 1, -0.1, Outcome::Step))
            .unwrap();

        assert_eq!(learner.policy()[1], 0, "winning action preferred");
        assert_eq!(next, learner.policy()[1]);
    }

    #[test]
    fn observed_positive_action_beats_unobserved() {
        let mut learner = greedy_learner(3, 2);
        learner
            .percept(&step(0, 1, 1, 2.0, Outcome::Step))
            .unwrap();
        learner.policy_update();

        assert_eq!(learner.policy()[0], 1);
        // a state with no observations at all defaults to the lowest index
        assert_eq!(learner.policy()[2], 0);
    }

    #[test]
    fn epsilon_decays_once_per_episode() {
        let mut learner = AdpLearner::new(
            2,
            2,
            AdpLearnerConfig {
                gamma: 0.9,
                exploration: EpsilonGreedy::new(
                    decay::Geometric::new(0.5, 1.0, 0.0).unwrap(),
                ),
                tolerance: 1e-4,
                max_sweeps: 1000,
            },
        );
        assert_eq!(learner.epsilon(), 1.0);
        for _ in 0..3 {
            learner.policy_update();
        }
        assert!((learner.epsilon() - 0.125).abs() < 1e-6);
        assert_eq!(learner.episode(), 3);
    }

    #[test]
    fn learns_to_win_a_deterministic_grid_world() {
        let mut env = GridWorld::from_rows(
            &["...W", ".#.L", "...."],
            RewardTable {
                step: -0.04,
                win: 1.0,
                lose: -1.0,
                blocked: -0.04,
            },
            0.0,
        )
        .unwrap();
        let start = env.state_from_pos((2, 0));

        let mut learner = AdpLearner::new(
            env.num_states(),
            env.num_actions(),
            AdpLearnerConfig {
                gamma: 0.9,
                exploration: EpsilonGreedy::new(
                    decay::Geometric::new(0.99, 1.0, 0.05).unwrap(),
                ),
                tolerance: 1e-4,
                max_sweeps: 1000,
            },
        );

        let mut rewards = Vec::with_capacity(300);
        for _ in 0..300 {
            let summary = learner.go(&mut env, start).unwrap();
            rewards.push(summary.reward);
        }

        // the greedy policy must route from the start cell to the win cell
        let mut state = start;
        let mut won = false;
        for _ in 0..50 {
            let action = learner.policy()[state];
            let transition = env.step(state, action).unwrap();
            match transition.outcome {
                Outcome::Win => {
                    won = true;
                    break;
                }
                Outcome::Lose => break,
                _ => state = transition.next_state,
            }
        }
        assert!(won, "greedy policy failed to reach the win cell");

        let early: f32 = rewards[..50].iter().sum::<f32>() / 50.0;
        let late: f32 = rewards[250..].iter().sum::<f32>() / 50.0;
        assert!(late > early, "per-episode reward did not trend upward");
    }
}
