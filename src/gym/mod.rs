pub mod grid_world;

pub use grid_world::{Cell, GridWorld, GwAction, MapError, RewardTable};
