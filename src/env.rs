use crate::error::Error;

/// The tagged category of a single environment step
///
/// Episode termination is decided by matching on this tag, never by comparing
/// reward magnitudes against sentinel values.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    /// An ordinary, non-terminal move
    Step,
    /// The episode ended in a win
    Win,
    /// The episode ended in a loss
    Lose,
    /// The intended move was blocked by a wall or the grid boundary
    Blocked,
}

impl Outcome {
    /// Whether this outcome ends the episode
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Win | Self::Lose)
    }
}

/// A single observed transition in the environment
///
/// Ephemeral: consumed by the model update, only aggregated statistics are
/// retained.
#[derive(Clone, Copy, Debug)]
pub struct Transition {
    /// The state the action was taken from
    pub state: usize,
    /// The action taken
    pub action: usize,
    /// The state the environment moved to
    pub next_state: usize,
    /// The reward received for the move
    pub reward: f32,
    /// The category of the move
    pub outcome: Outcome,
}

/// Represents a finite Markov decision process, defining the dynamics of an
/// environment in which an agent can operate.
///
/// States and actions are dense `usize` indices so tabular learners can use
/// flat storage. The state space and action space are fixed at construction.
pub trait Environment {
    /// Number of states in the environment
    fn num_states(&self) -> usize;

    /// Number of actions available in every state
    fn num_actions(&self) -> usize;

    /// Perform `action` from `state`, producing the observed transition
    ///
    /// The dynamics may be stochastic. Implementations must reject
    /// out-of-range indices with an [`Error`] rather than clamping them.
    fn step(&mut self, state: usize, action: usize) -> Result<Transition, Error>;
}
