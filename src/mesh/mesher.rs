//! Chunk store with budgeted incremental remeshing.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::core::config::MesherConfig;
use crate::math::Aabb;
use crate::mesh::chunk::{CollisionMesh, VoxelChunk};
use crate::mesh::marcher::{MarchParams, MeshMarcher};
use crate::mesh::occlusion::OcclusionGrid;
use crate::voxel::cell::{ChunkCoord, GridDims};
use crate::voxel::density::DensityField;

/// Pending-set key: top layer first, then row by row.
type RemeshKey = (Reverse<i32>, i32, i32);

fn key(coord: ChunkCoord) -> RemeshKey {
    (Reverse(coord.layer), coord.z, coord.x)
}

fn coord(key: &RemeshKey) -> ChunkCoord {
    ChunkCoord::new(key.2, key.0.0, key.1)
}

/// Owns every chunk mesh of one density field.
///
/// Dirty chunks are queued with [`enqueue`](ChunkMesher::enqueue) and
/// remeshed at most `remesh_budget` per [`remesh`](ChunkMesher::remesh) call.
/// Layers are processed from the top down so that a layer always reads the
/// occlusion flags its upper neighbour produced.
#[derive(Debug)]
pub struct ChunkMesher {
    dims: GridDims,
    config: MesherConfig,
    cell_size: f32,
    cell_height: f32,
    chunks: Vec<VoxelChunk>,
    occlusion: OcclusionGrid,
    pending: BTreeSet<RemeshKey>,
    updated: Vec<ChunkCoord>,
    marcher: MeshMarcher,
}

impl ChunkMesher {
    /// Create the chunk grid. Chunks start empty until meshed.
    pub fn new(dims: GridDims, cell_size: f32, cell_height: f32, config: MesherConfig) -> Self {
        let mut chunks = Vec::with_capacity(dims.chunk_count());
        for layer in 0..dims.layers as i32 {
            for z in 0..dims.chunks_z() as i32 {
                for x in 0..dims.chunks_x() as i32 {
                    chunks.push(VoxelChunk::new(ChunkCoord::new(x, layer, z)));
                }
            }
        }

        Self {
            dims,
            config,
            cell_size,
            cell_height,
            chunks,
            occlusion: OcclusionGrid::new(dims.width, dims.depth, dims.layers),
            pending: BTreeSet::new(),
            updated: Vec::new(),
            marcher: MeshMarcher::new(),
        }
    }

    pub fn config(&self) -> &MesherConfig {
        &self.config
    }

    fn params(&self) -> MarchParams {
        MarchParams {
            iso_level: self.config.iso_level,
            cell_size: self.cell_size,
            cell_height: self.cell_height,
            chunk_dim: self.dims.chunk_dim,
            occlusion_checks: self.config.occlusion_checks,
        }
    }

    /// Queue a chunk. Chunks outside the grid are dropped and return `false`.
    pub fn enqueue(&mut self, coord: ChunkCoord) -> bool {
        if !coord.is_valid(&self.dims) {
            log::trace!("Dropping remesh request for out-of-grid chunk {:?}", coord);
            return false;
        }
        self.pending.insert(key(coord));
        true
    }

    /// Queue many chunks, returning how many were accepted.
    pub fn enqueue_all(&mut self, coords: impl IntoIterator<Item = ChunkCoord>) -> usize {
        coords.into_iter().filter(|&c| self.enqueue(c)).count()
    }

    /// Queue every chunk of the grid.
    pub fn enqueue_everything(&mut self) {
        let coords: Vec<_> = self.chunks.iter().map(|c| c.coord).collect();
        self.enqueue_all(coords);
    }

    /// Chunks waiting for a remesh.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, coord: ChunkCoord) -> bool {
        self.pending.contains(&key(coord))
    }

    /// Remesh up to the configured budget of queued chunks. The rest stay
    /// queued for later calls.
    ///
    /// Returns the number of chunks remeshed.
    pub fn remesh(&mut self, field: &DensityField) -> usize {
        let budget = self.config.remesh_budget;
        let mut done = 0;
        while done < budget {
            let Some(next) = self.pending.pop_first() else {
                break;
            };
            self.remesh_chunk(field, coord(&next));
            done += 1;
        }
        if done > 0 {
            log::debug!("Remeshed {} chunks, {} still pending", done, self.pending.len());
        }
        done
    }

    /// Remesh every chunk, top layer first, ignoring the budget.
    pub fn triangulate_all(&mut self, field: &DensityField) -> usize {
        self.pending.clear();
        let mut triangles = 0;
        for layer in (0..self.dims.layers).rev() {
            triangles += self.triangulate_layer(field, layer);
        }
        log::info!(
            "Triangulated {} chunks over {} layers: {} triangles",
            self.chunks.len(),
            self.dims.layers,
            triangles
        );
        triangles
    }

    /// Remesh every chunk of one layer, ignoring the budget.
    ///
    /// Returns the layer's triangle count.
    pub fn triangulate_layer(&mut self, field: &DensityField, layer: u32) -> usize {
        if layer >= self.dims.layers {
            return 0;
        }
        let mut triangles = 0;
        for z in 0..self.dims.chunks_z() as i32 {
            for x in 0..self.dims.chunks_x() as i32 {
                let coord = ChunkCoord::new(x, layer as i32, z);
                self.pending.remove(&key(coord));
                triangles += self.remesh_chunk(field, coord);
            }
        }
        triangles
    }

    fn remesh_chunk(&mut self, field: &DensityField, coord: ChunkCoord) -> usize {
        let params = self.params();
        let stats = self.marcher.march_chunk(field, coord, &params, &mut self.occlusion);
        let mesh = self.marcher.finish();
        let triangles = mesh.triangle_count();

        let collision = self.config.collision.then(|| CollisionMesh::from_mesh(&mesh));
        let chunk = &mut self.chunks[coord.index(&self.dims)];
        chunk.is_empty = mesh.is_empty();
        chunk.is_solid_slab = stats.is_solid_slab();
        chunk.bounds = mesh.bounds();
        chunk.collision = collision;
        chunk.mesh = mesh;
        chunk.revision = chunk.revision.wrapping_add(1);
        self.updated.push(coord);
        triangles
    }

    /// Chunks remeshed since the last call, in remesh order.
    pub fn take_updated(&mut self) -> Vec<ChunkCoord> {
        std::mem::take(&mut self.updated)
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&VoxelChunk> {
        coord
            .is_valid(&self.dims)
            .then(|| &self.chunks[coord.index(&self.dims)])
    }

    pub fn chunks(&self) -> impl Iterator<Item = &VoxelChunk> {
        self.chunks.iter()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Chunks that currently hold geometry.
    pub fn non_empty_count(&self) -> usize {
        self.chunks.iter().filter(|c| !c.is_empty).count()
    }

    /// Bounds of all geometry, `Aabb::EMPTY` when nothing is meshed.
    pub fn bounds(&self) -> Aabb {
        self.chunks.iter().fold(Aabb::EMPTY, |acc, c| acc.union(&c.bounds))
    }

    pub fn triangle_count(&self) -> usize {
        self.chunks.iter().map(|c| c.mesh.triangle_count()).sum()
    }

    pub fn occlusion(&self) -> &OcclusionGrid {
        &self.occlusion
    }

    /// Toggle cap culling. Every chunk is queued so the change shows up.
    pub fn set_occlusion_checks_enabled(&mut self, enabled: bool) {
        if self.config.occlusion_checks != enabled {
            self.config.occlusion_checks = enabled;
            self.enqueue_everything();
        }
    }

    /// Toggle collision meshes. Every chunk is queued so the change shows up.
    pub fn set_collision_enabled(&mut self, enabled: bool) {
        if self.config.collision != enabled {
            self.config.collision = enabled;
            self.enqueue_everything();
        }
    }

    pub fn set_remesh_budget(&mut self, budget: usize) {
        self.config.remesh_budget = budget;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;
    use crate::voxel::cell::DensityCell;

    fn dims() -> GridDims {
        GridDims::new(20, 12, 3, 8)
    }

    fn mesher(budget: usize) -> ChunkMesher {
        let config = MesherConfig {
            remesh_budget: budget,
            ..MesherConfig::default()
        };
        ChunkMesher::new(dims(), 1.0, 1.0, config)
    }

    fn terrain() -> DensityField {
        let mut field = DensityField::with_dims(&dims());
        for z in 0..12 {
            for x in 0..20 {
                let h = 0.4 + 0.25 * ((x as f32 * 0.7).sin() + (z as f32 * 0.5).cos());
                field.set(DensityCell::new(x, z, 0), 1.0, 1.0);
                field.set(DensityCell::new(x, z, 1), h, 1.0);
                field.set(DensityCell::new(x, z, 2), h - 0.4, 1.0);
            }
        }
        field
    }

    fn assert_same_meshes(a: &ChunkMesher, b: &ChunkMesher) {
        for (ca, cb) in a.chunks().zip(b.chunks()) {
            assert_eq!(ca.coord, cb.coord);
            assert_eq!(ca.mesh, cb.mesh, "chunk {:?} differs", ca.coord);
            assert_eq!(ca.is_solid_slab, cb.is_solid_slab);
        }
        assert_eq!(a.occlusion(), b.occlusion());
    }

    #[test]
    fn test_creates_all_chunks() {
        let m = mesher(4);
        assert_eq!(m.chunk_count(), 3 * 2 * 3);
        assert!(m.chunk(ChunkCoord::new(2, 2, 1)).is_some());
        assert!(m.chunk(ChunkCoord::new(3, 0, 0)).is_none());
        assert_eq!(m.non_empty_count(), 0);
    }

    #[test]
    fn test_invalid_chunks_dropped() {
        let mut m = mesher(4);
        assert!(!m.enqueue(ChunkCoord::new(-1, 0, 0)));
        assert!(!m.enqueue(ChunkCoord::new(0, 3, 0)));
        assert!(m.enqueue(ChunkCoord::new(0, 0, 0)));
        assert!(m.enqueue(ChunkCoord::new(0, 0, 0)));
        assert_eq!(m.pending_count(), 1);
    }

    #[test]
    fn test_budget_limits_work() {
        let field = terrain();
        let mut m = mesher(4);
        m.enqueue_everything();
        assert_eq!(m.pending_count(), 18);
        assert_eq!(m.remesh(&field), 4);
        assert_eq!(m.pending_count(), 14);
        assert_eq!(m.take_updated().len(), 4);
        assert!(m.take_updated().is_empty());
    }

    #[test]
    fn test_top_layer_first() {
        let field = terrain();
        let mut m = mesher(6);
        m.enqueue(ChunkCoord::new(0, 0, 0));
        m.enqueue(ChunkCoord::new(1, 2, 1));
        m.enqueue(ChunkCoord::new(0, 2, 1));
        m.enqueue(ChunkCoord::new(2, 2, 0));
        m.enqueue(ChunkCoord::new(0, 1, 0));
        m.remesh(&field);
        assert_eq!(
            m.take_updated(),
            vec![
                ChunkCoord::new(2, 2, 0),
                ChunkCoord::new(0, 2, 1),
                ChunkCoord::new(1, 2, 1),
                ChunkCoord::new(0, 1, 0),
                ChunkCoord::new(0, 0, 0),
            ]
        );
    }

    #[test]
    fn test_budgeted_backlog_matches_full_triangulation() {
        let mut field = terrain();
        let mut budgeted = mesher(3);
        budgeted.triangulate_all(&field);

        // Dig through layer 2 and 1, fill a cap on layer 2.
        for (x, z) in [(3, 3), (4, 3), (9, 6), (15, 9)] {
            field.set(DensityCell::new(x, z, 2), 0.0, 1.0);
            field.set(DensityCell::new(x, z, 1), 0.0, 1.0);
        }
        for z in 4..8 {
            for x in 10..14 {
                field.set(DensityCell::new(x, z, 2), 1.0, 1.0);
                field.set(DensityCell::new(x, z, 1), 1.0, 1.0);
            }
        }
        budgeted.enqueue_everything();

        let mut ticks = 0;
        while budgeted.pending_count() > 0 {
            budgeted.remesh(&field);
            ticks += 1;
            assert!(ticks < 100, "backlog never drained");
        }
        assert_eq!(ticks, 6);

        let mut full = mesher(3);
        full.triangulate_all(&field);
        assert_same_meshes(&budgeted, &full);
    }

    #[test]
    fn test_triangulate_all_flags() {
        let mut field = DensityField::with_dims(&dims());
        field.fill_layer(0, 1.0);
        field.fill_layer(1, 1.0);
        let mut m = mesher(4);
        m.enqueue(ChunkCoord::new(0, 0, 0));
        m.triangulate_all(&field);

        assert_eq!(m.pending_count(), 0);
        let lower = m.chunk(ChunkCoord::new(0, 0, 0)).expect("chunk");
        assert!(lower.is_solid_slab);
        assert!(lower.is_empty, "capped slab should be culled");
        let upper = m.chunk(ChunkCoord::new(0, 1, 0)).expect("chunk");
        assert!(upper.is_solid_slab);
        assert!(!upper.is_empty);
        assert!(!upper.bounds.is_empty());
        assert_eq!(upper.revision, 1);
        assert!(upper.collision.is_none());
        let top = m.chunk(ChunkCoord::new(0, 2, 0)).expect("chunk");
        assert!(top.is_empty && !top.is_solid_slab);

        // Only the layer 1 cap survives.
        assert_eq!(m.bounds(), Aabb::new(Vec3::new(0.5, 2.0, 0.5), Vec3::new(19.5, 2.0, 11.5)));
    }

    #[test]
    fn test_toggles_requeue_and_apply() {
        let mut field = DensityField::with_dims(&dims());
        field.fill_layer(0, 1.0);
        field.fill_layer(1, 1.0);
        let mut m = mesher(64);
        m.triangulate_all(&field);

        m.set_occlusion_checks_enabled(false);
        assert_eq!(m.pending_count(), m.chunk_count());
        m.remesh(&field);
        assert!(!m.chunk(ChunkCoord::new(0, 0, 0)).expect("chunk").is_empty);

        m.set_collision_enabled(true);
        m.remesh(&field);
        let chunk = m.chunk(ChunkCoord::new(0, 1, 0)).expect("chunk");
        let collision = chunk.collision.as_ref().expect("collision mesh");
        assert_eq!(collision.indices, chunk.mesh.indices);

        m.set_collision_enabled(true);
        assert_eq!(m.pending_count(), 0);
    }

    #[test]
    fn test_triangulate_layer_clears_its_pending() {
        let field = terrain();
        let mut m = mesher(4);
        m.enqueue(ChunkCoord::new(0, 1, 0));
        m.enqueue(ChunkCoord::new(0, 0, 0));
        m.triangulate_layer(&field, 1);
        assert_eq!(m.pending_count(), 1);
        assert!(m.is_pending(ChunkCoord::new(0, 0, 0)));
        assert_eq!(m.triangulate_layer(&field, 7), 0);
    }
}
