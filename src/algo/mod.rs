pub mod adp;

pub use adp::{AdpLearner, AdpLearnerConfig, EpisodeSummary};
