/// Implemented RL algorithms
pub mod algo;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Environment
pub mod env;

/// Error types
pub mod error;

/// Exploration policies
pub mod exploration;

/// Grid-world testing environment
pub mod gym;

/// Empirical MDP models learned from observed transitions
pub mod model;

mod util;
