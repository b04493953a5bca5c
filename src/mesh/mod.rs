//! Marching-squares chunk meshing
//!
//! Each layer of a density field is split into `chunk_dim × chunk_dim`
//! chunks. A chunk's mesh is a flat cap at the top of its layer, outlined by
//! vertical skirts down to the layer floor. Fully solid cells hidden under a
//! solid cell of the layer above are culled.

pub mod cases;
pub mod marcher;
pub mod occlusion;
pub mod chunk;
pub mod mesher;

pub use chunk::{ChunkMesh, CollisionMesh, MeshVertex, VoxelChunk};
pub use marcher::{MarchParams, MarchStats, MeshMarcher};
pub use mesher::ChunkMesher;
pub use occlusion::OcclusionGrid;
