//! Terrain orchestration and procedural height maps

pub mod generator;
pub mod world;

pub use generator::{HeightMapGenerator, TerrainParams};
pub use world::{TerrainWorld, TickReport};
