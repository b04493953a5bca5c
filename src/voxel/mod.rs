//! Layered density grid: addressing, fields, edits and liquid flow

pub mod cell;
pub mod density;
pub mod heightmap;
pub mod dirty;
pub mod edit;
pub mod water;

pub use cell::{ChunkCoord, DensityCell, GridDims};
pub use density::DensityField;
pub use heightmap::HeightMap;
pub use dirty::DirtyTracker;
pub use edit::{EditCommand, Material, SolidEditQueue};
pub use water::{LiquidSolver, SubStepReport};
