//! Strata - layered voxel terrain with liquid flow and incremental
//! marching-squares meshing

pub mod core;
pub mod math;
pub mod voxel;
pub mod mesh;
pub mod persist;
pub mod terrain;
pub mod debug;

pub use crate::core::{Error, Result, TerrainConfig};
pub use crate::terrain::{TerrainWorld, TickReport};
