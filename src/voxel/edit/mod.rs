//! Terrain edit commands and the solid edit queue.
//!
//! Edits arrive as [`EditCommand`]s, already ordered by the caller. Solid
//! edits are batched in a [`SolidEditQueue`] and applied once per tick with a
//! small falloff; liquid edits are owned by the liquid solver.

pub mod command;
pub mod solid;

pub use command::{EditCommand, Material};
pub use solid::SolidEditQueue;
