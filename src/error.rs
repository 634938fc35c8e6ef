use thiserror::Error;

/// Errors returned by the learner's public surface
///
/// Out-of-range indices are rejected immediately rather than clamped, so a
/// buggy training loop fails at the call site instead of corrupting the
/// learned model.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("state index {index} is out of range (num_states = {num_states})")]
    InvalidState { index: usize, num_states: usize },
    #[error("action index {index} is out of range (num_actions = {num_actions})")]
    InvalidAction { index: usize, num_actions: usize },
}
