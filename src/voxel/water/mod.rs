//! Liquid simulation over the layered grid.

pub mod solver;

pub use solver::{stable_level, LiquidSolver, SubStepReport};
