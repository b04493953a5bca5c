//! Chunk mesh data handed to the renderer.

use bytemuck::{Pod, Zeroable};

use crate::core::types::Vec3;
use crate::math::Aabb;
use crate::voxel::cell::ChunkCoord;

/// Vertex of a terrain mesh - 24 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }
}

/// Indexed triangle list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkMesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl ChunkMesh {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex buffer as raw bytes for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index buffer as raw bytes for upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Vertex positions of triangle `i`.
    pub fn triangle(&self, i: usize) -> [Vec3; 3] {
        let base = i * 3;
        [
            self.vertices[self.indices[base] as usize].position(),
            self.vertices[self.indices[base + 1] as usize].position(),
            self.vertices[self.indices[base + 2] as usize].position(),
        ]
    }

    /// Bounds of all vertices, `Aabb::EMPTY` when there are none.
    pub fn bounds(&self) -> Aabb {
        let mut aabb = Aabb::EMPTY;
        for v in &self.vertices {
            aabb.expand(v.position());
        }
        aabb
    }
}

/// Positions-only copy of a chunk mesh for physics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionMesh {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl CollisionMesh {
    pub fn from_mesh(mesh: &ChunkMesh) -> Self {
        Self {
            positions: mesh.vertices.iter().map(MeshVertex::position).collect(),
            indices: mesh.indices.clone(),
        }
    }
}

/// Mesh for one `chunk_dim × chunk_dim` footprint of one layer.
///
/// Regenerated as a whole on every remesh.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelChunk {
    pub coord: ChunkCoord,
    pub mesh: ChunkMesh,
    /// No triangles.
    pub is_empty: bool,
    /// Every marching cell of the footprint is fully solid.
    pub is_solid_slab: bool,
    pub collision: Option<CollisionMesh>,
    pub bounds: Aabb,
    /// Number of times this chunk has been meshed.
    pub revision: u32,
}

impl VoxelChunk {
    /// Unmeshed chunk.
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            mesh: ChunkMesh::default(),
            is_empty: true,
            is_solid_slab: false,
            collision: None,
            bounds: Aabb::EMPTY,
            revision: 0,
        }
    }
}
