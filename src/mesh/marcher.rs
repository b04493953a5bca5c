//! Per-chunk marching-squares triangulation.

use std::collections::HashMap;

use crate::core::types::Vec3;
use crate::mesh::cases::{self, CellPoint, FULL};
use crate::mesh::chunk::{ChunkMesh, MeshVertex};
use crate::mesh::occlusion::OcclusionGrid;
use crate::voxel::cell::{ChunkCoord, DensityCell};
use crate::voxel::density::DensityField;

/// Location flags packed into the low bits of a vertex id.
pub mod vertex_flags {
    /// Vertex sits on a density sample.
    pub const CORNER: u64 = 1;
    /// Crossing between a sample and its `+x` neighbour.
    pub const EDGE_X: u64 = 2;
    /// Crossing between a sample and its `+z` neighbour.
    pub const EDGE_Z: u64 = 4;
    /// Top rim of a skirt.
    pub const SKIRT: u64 = 8;
    /// Bottom rim of a skirt.
    pub const BOTTOM: u64 = 16;
}

/// Canonical vertex id: `(sample_index << 16) | flags`.
///
/// Every cell that touches a sample or sample edge derives the same id for
/// it, so shared vertices are emitted once per chunk.
#[inline]
pub fn vertex_id(sample_index: u64, flags: u64) -> u64 {
    (sample_index << 16) | flags
}

/// Point between `a` and `b` where the density crosses `iso`.
pub fn interpolate(a: Vec3, b: Vec3, density_a: f32, density_b: f32, iso: f32) -> Vec3 {
    let span = density_b - density_a;
    let t = if span.abs() < 1e-6 {
        0.5
    } else {
        ((iso - density_a) / span).clamp(0.0, 1.0)
    };
    a + (b - a) * t
}

/// Sampling parameters for one chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarchParams {
    pub iso_level: f32,
    pub cell_size: f32,
    pub cell_height: f32,
    pub chunk_dim: u32,
    pub occlusion_checks: bool,
}

/// Cell counts from one chunk pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MarchStats {
    /// Marching cells visited.
    pub cells: usize,
    /// Cells with every corner filled.
    pub solid_cells: usize,
    /// Solid cells skipped under a cap.
    pub culled_cells: usize,
}

impl MarchStats {
    pub fn is_solid_slab(&self) -> bool {
        self.cells > 0 && self.solid_cells == self.cells
    }
}

#[derive(Clone, Copy, Debug)]
struct RimPoint {
    id: u64,
    position: Vec3,
}

/// Triangulation context for one chunk at a time.
///
/// Buffers are reused across chunks; [`MeshMarcher::finish`] hands the
/// current mesh out and leaves the marcher ready for the next chunk.
#[derive(Debug, Default)]
pub struct MeshMarcher {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Vec<u32>,
    lookup: HashMap<u64, u32>,
    silhouette: Vec<(RimPoint, RimPoint)>,
}

impl MeshMarcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Triangulate the footprint of `coord` into the marcher's buffers.
    ///
    /// Writes this layer's occlusion flags and reads the layer above. The
    /// footprint is clipped so every sampled corner is inside the grid.
    pub fn march_chunk(
        &mut self,
        field: &DensityField,
        coord: ChunkCoord,
        params: &MarchParams,
        occlusion: &mut OcclusionGrid,
    ) -> MarchStats {
        let mut stats = MarchStats::default();
        let layer = coord.layer;
        let dim = params.chunk_dim as i32;
        let origin = coord.origin_cell(params.chunk_dim);
        let x_end = (origin.x + dim).min(field.width() as i32 - 1);
        let z_end = (origin.z + dim).min(field.depth() as i32 - 1);
        let top_y = (layer + 1) as f32 * params.cell_height;

        for z in origin.z..z_end {
            for x in origin.x..x_end {
                stats.cells += 1;
                let corners = [
                    field.sample(layer as usize, x as u32, z as u32),
                    field.sample(layer as usize, x as u32 + 1, z as u32),
                    field.sample(layer as usize, x as u32 + 1, z as u32 + 1),
                    field.sample(layer as usize, x as u32, z as u32 + 1),
                ];
                let code = cases::case_code(corners[0], corners[1], corners[2], corners[3], params.iso_level);

                if code == FULL {
                    stats.solid_cells += 1;
                    occlusion.set(layer, x, z, true);
                    if params.occlusion_checks && occlusion.is_capped(layer, x, z) {
                        stats.culled_cells += 1;
                        continue;
                    }
                } else {
                    occlusion.set(layer, x, z, false);
                    if code == 0 {
                        continue;
                    }
                }

                let joined = cases::is_saddle(code)
                    && corners.iter().sum::<f32>() * 0.25 >= params.iso_level;
                let cell = CellSampler {
                    x,
                    z,
                    width: field.width(),
                    corners,
                    top_y,
                    params,
                };
                for polygon in cases::polygons(code, joined) {
                    self.emit_polygon(&cell, polygon);
                }
            }
        }

        self.extrude_skirts(layer as f32 * params.cell_height);
        stats
    }

    fn emit_polygon(&mut self, cell: &CellSampler<'_>, polygon: &[CellPoint]) {
        let mut rim = [RimPoint { id: 0, position: Vec3::ZERO }; 8];
        let n = polygon.len();
        for (slot, &point) in rim.iter_mut().zip(polygon) {
            *slot = cell.resolve(point);
        }

        let first = self.vertex(rim[0].id, rim[0].position);
        for i in 1..n - 1 {
            let b = self.vertex(rim[i].id, rim[i].position);
            let c = self.vertex(rim[i + 1].id, rim[i + 1].position);
            self.triangle(first, b, c);
        }

        for i in 0..n {
            let j = (i + 1) % n;
            if !polygon[i].is_corner() && !polygon[j].is_corner() {
                self.silhouette.push((rim[i], rim[j]));
            }
        }
    }

    // Walls hang from each outline edge down to the layer floor.
    fn extrude_skirts(&mut self, bot_y: f32) {
        use vertex_flags::{BOTTOM, SKIRT};

        let edges = std::mem::take(&mut self.silhouette);
        for (a, b) in &edges {
            let a_top = self.vertex(a.id | SKIRT, a.position);
            let b_top = self.vertex(b.id | SKIRT, b.position);
            let a_bot = self.vertex(a.id | SKIRT | BOTTOM, Vec3::new(a.position.x, bot_y, a.position.z));
            let b_bot = self.vertex(b.id | SKIRT | BOTTOM, Vec3::new(b.position.x, bot_y, b.position.z));
            self.triangle(a_top, b_bot, b_top);
            self.triangle(a_top, a_bot, b_bot);
        }
        self.silhouette = edges;
        self.silhouette.clear();
    }

    fn vertex(&mut self, id: u64, position: Vec3) -> u32 {
        if let Some(&index) = self.lookup.get(&id) {
            return index;
        }
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(Vec3::ZERO);
        self.lookup.insert(id, index);
        index
    }

    fn triangle(&mut self, a: u32, b: u32, c: u32) {
        let (pa, pb, pc) = (
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        );
        // Area-weighted face normal.
        let face = (pb - pa).cross(pc - pa);
        for i in [a, b, c] {
            self.normals[i as usize] += face;
        }
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Move the finished mesh out and reset for the next chunk.
    pub fn finish(&mut self) -> ChunkMesh {
        let positions = std::mem::take(&mut self.positions);
        let normals = std::mem::take(&mut self.normals);
        self.lookup.clear();

        let vertices = positions
            .into_iter()
            .zip(normals)
            .map(|(p, n)| MeshVertex::new(p, n.try_normalize().unwrap_or(Vec3::Y)))
            .collect();
        ChunkMesh {
            vertices,
            indices: std::mem::take(&mut self.indices),
        }
    }
}

/// One marching cell's samples and where they sit in the world.
struct CellSampler<'a> {
    x: i32,
    z: i32,
    width: u32,
    /// Densities in case-bit order: left-near, right-near, right-far, left-far
    corners: [f32; 4],
    top_y: f32,
    params: &'a MarchParams,
}

impl CellSampler<'_> {
    fn corner(&self, point: CellPoint) -> (u64, Vec3, f32) {
        let (dx, dz) = point.corner_offset().unwrap_or((0, 0));
        let slot = point.corner_bit().map_or(0, |bit| bit.trailing_zeros() as usize);
        let sample = DensityCell::new(self.x + dx, self.z + dz, 0);
        let mut position = sample.world_center(self.params.cell_size, self.params.cell_height);
        position.y = self.top_y;
        (sample.index(self.width) as u64, position, self.corners[slot])
    }

    fn resolve(&self, point: CellPoint) -> RimPoint {
        match point.edge_corners() {
            None => {
                let (index, position, _) = self.corner(point);
                RimPoint {
                    id: vertex_id(index, vertex_flags::CORNER),
                    position,
                }
            }
            Some((a, b)) => {
                let (owner, pa, da) = self.corner(a);
                let (_, pb, db) = self.corner(b);
                let axis = match point {
                    CellPoint::Near | CellPoint::Far => vertex_flags::EDGE_X,
                    _ => vertex_flags::EDGE_Z,
                };
                RimPoint {
                    id: vertex_id(owner, axis),
                    position: interpolate(pa, pb, da, db, self.params.iso_level),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(chunk_dim: u32) -> MarchParams {
        MarchParams {
            iso_level: 0.5,
            cell_size: 1.0,
            cell_height: 1.0,
            chunk_dim,
            occlusion_checks: true,
        }
    }

    fn field_from(width: u32, depth: u32, layers: u32, values: &[(u32, u32, u32, f32)]) -> DensityField {
        let mut field = DensityField::new(width, depth, layers);
        for &(x, z, layer, v) in values {
            field.set(DensityCell::new(x as i32, z as i32, layer as i32), v, 1.0);
        }
        field
    }

    fn march(field: &DensityField, coord: ChunkCoord, params: &MarchParams, occ: &mut OcclusionGrid) -> (ChunkMesh, MarchStats) {
        let mut marcher = MeshMarcher::new();
        let stats = marcher.march_chunk(field, coord, params, occ);
        (marcher.finish(), stats)
    }

    #[test]
    fn test_interpolate() {
        let a = Vec3::ZERO;
        let b = Vec3::new(2.0, 0.0, 0.0);
        assert_eq!(interpolate(a, b, 0.0, 1.0, 0.25), Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(interpolate(a, b, 1.0, 0.0, 0.25), Vec3::new(1.5, 0.0, 0.0));
        assert_eq!(interpolate(a, b, 0.7, 0.7, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(interpolate(a, b, 0.0, 0.2, 0.5), b);
    }

    #[test]
    fn test_vertex_id_layout() {
        assert_eq!(vertex_id(3, vertex_flags::EDGE_Z), (3 << 16) | 4);
        assert_ne!(vertex_id(3, vertex_flags::EDGE_X), vertex_id(3, vertex_flags::EDGE_Z));
    }

    #[test]
    fn test_full_field_welds_quads() {
        let mut field = DensityField::new(3, 3, 1);
        field.fill_layer(0, 1.0);
        let mut occ = OcclusionGrid::new(3, 3, 1);
        let (mesh, stats) = march(&field, ChunkCoord::new(0, 0, 0), &params(16), &mut occ);

        assert_eq!(stats.cells, 4);
        assert!(stats.is_solid_slab());
        assert_eq!(mesh.triangle_count(), 8);
        assert_eq!(mesh.vertices.len(), 9);
        for v in &mesh.vertices {
            assert_eq!(v.position[1], 1.0);
            assert!((v.normal() - Vec3::Y).length() < 1e-6);
        }
        assert_eq!(occ.solid_count(0), 4);
    }

    #[test]
    fn test_single_sample_gets_skirts() {
        let field = field_from(3, 3, 1, &[(1, 1, 0, 1.0)]);
        let mut occ = OcclusionGrid::new(3, 3, 1);
        let (mesh, stats) = march(&field, ChunkCoord::new(0, 0, 0), &params(16), &mut occ);

        assert!(!stats.is_solid_slab());
        // 4 cap triangles and 4 skirt quads
        assert_eq!(mesh.triangle_count(), 4 + 8);
        // corner + 4 crossings on top, 4 skirt tops, 4 skirt bottoms
        assert_eq!(mesh.vertices.len(), 13);

        let bottoms = mesh.vertices.iter().filter(|v| v.position[1] == 0.0).count();
        assert_eq!(bottoms, 4);
        let crossing = Vec3::new(1.0, 1.0, 1.5);
        assert!(mesh.vertices.iter().any(|v| (v.position() - crossing).length() < 1e-6));
    }

    #[test]
    fn test_top_faces_point_up_and_skirts_out() {
        let field = field_from(3, 3, 1, &[(1, 1, 0, 1.0)]);
        let mut occ = OcclusionGrid::new(3, 3, 1);
        let (mesh, _) = march(&field, ChunkCoord::new(0, 0, 0), &params(16), &mut occ);
        let center = Vec3::new(1.5, 0.5, 1.5);

        for i in 0..mesh.triangle_count() {
            let [a, b, c] = mesh.triangle(i);
            let normal = (b - a).cross(c - a);
            if a.y == b.y && b.y == c.y {
                assert!(normal.y > 0.0, "top triangle {} faces down", i);
            } else {
                let mid = (a + b + c) / 3.0;
                let outward = Vec3::new(mid.x - center.x, 0.0, mid.z - center.z);
                assert!(normal.dot(outward) > 0.0, "skirt triangle {} faces inward", i);
            }
        }
    }

    #[test]
    fn test_saddle_resolution() {
        let joined = field_from(2, 2, 1, &[(0, 0, 0, 1.0), (1, 1, 0, 1.0)]);
        let mut occ = OcclusionGrid::new(2, 2, 1);
        let (mesh, _) = march(&joined, ChunkCoord::new(0, 0, 0), &params(16), &mut occ);
        // hexagon fan + two skirt quads
        assert_eq!(mesh.triangle_count(), 4 + 4);

        let split = field_from(2, 2, 1, &[(0, 0, 0, 0.6), (1, 1, 0, 0.6)]);
        let (mesh, _) = march(&split, ChunkCoord::new(0, 0, 0), &params(16), &mut occ);
        // two corner triangles + two skirt quads
        assert_eq!(mesh.triangle_count(), 2 + 4);
    }

    #[test]
    fn test_chunk_seam_shares_positions() {
        // Blob straddling the boundary between chunks 0 and 1 (chunk_dim 4).
        let mut values = Vec::new();
        for z in 2..6 {
            for x in 2..7 {
                values.push((x, z, 0, if (x + z) % 3 == 0 { 0.8 } else { 0.55 }));
            }
        }
        let field = field_from(9, 8, 1, &values);
        let p = params(4);
        let mut occ = OcclusionGrid::new(9, 8, 1);
        let (left, _) = march(&field, ChunkCoord::new(0, 0, 1), &p, &mut occ);
        let (right, _) = march(&field, ChunkCoord::new(1, 0, 1), &p, &mut occ);

        // Sample column x = 4 sits at world x = 4.5 and is shared by both chunks.
        let on_seam = |mesh: &ChunkMesh| {
            let mut pts: Vec<[u32; 3]> = mesh
                .vertices
                .iter()
                .filter(|v| (v.position[0] - 4.5).abs() < 1e-6)
                .map(|v| v.position.map(f32::to_bits))
                .collect();
            pts.sort();
            pts.dedup();
            pts
        };
        let seam = on_seam(&left);
        assert!(!seam.is_empty());
        assert_eq!(seam, on_seam(&right));
    }

    #[test]
    fn test_occlusion_culls_capped_cells() {
        let mut field = DensityField::new(3, 3, 2);
        field.fill_layer(0, 1.0);
        field.fill_layer(1, 1.0);
        let mut occ = OcclusionGrid::new(3, 3, 2);
        let p = params(16);

        let (upper, _) = march(&field, ChunkCoord::new(0, 1, 0), &p, &mut occ);
        assert_eq!(upper.triangle_count(), 8);
        let (lower, stats) = march(&field, ChunkCoord::new(0, 0, 0), &p, &mut occ);
        assert!(lower.is_empty());
        assert_eq!(stats.culled_cells, 4);
        assert!(stats.is_solid_slab());
        assert_eq!(occ.solid_count(0), 4);

        let unchecked = MarchParams { occlusion_checks: false, ..p };
        let (lower, stats) = march(&field, ChunkCoord::new(0, 0, 0), &unchecked, &mut occ);
        assert_eq!(lower.triangle_count(), 8);
        assert_eq!(stats.culled_cells, 0);
    }

    #[test]
    fn test_partial_cap_does_not_cull() {
        let mut field = DensityField::new(3, 3, 2);
        field.fill_layer(0, 1.0);
        field.set(DensityCell::new(0, 0, 1), 1.0, 1.0);
        let mut occ = OcclusionGrid::new(3, 3, 2);
        let p = params(16);

        march(&field, ChunkCoord::new(0, 1, 0), &p, &mut occ);
        let (lower, stats) = march(&field, ChunkCoord::new(0, 0, 0), &p, &mut occ);
        assert_eq!(stats.culled_cells, 0);
        assert_eq!(lower.triangle_count(), 8);
    }

    #[test]
    fn test_empty_and_out_of_grid_chunk() {
        let field = DensityField::new(5, 5, 1);
        let mut occ = OcclusionGrid::new(5, 5, 1);
        let (mesh, stats) = march(&field, ChunkCoord::new(0, 0, 0), &params(4), &mut occ);
        assert!(mesh.is_empty());
        assert_eq!(stats.cells, 16);

        // Chunk 1 only holds the last sample column: no marching cells.
        let (mesh, stats) = march(&field, ChunkCoord::new(1, 0, 0), &params(4), &mut occ);
        assert!(mesh.is_empty());
        assert_eq!(stats.cells, 0);
        assert!(!stats.is_solid_slab());
    }

    #[test]
    fn test_finish_resets() {
        let mut field = DensityField::new(3, 3, 1);
        field.fill_layer(0, 1.0);
        let mut occ = OcclusionGrid::new(3, 3, 1);
        let mut marcher = MeshMarcher::new();
        marcher.march_chunk(&field, ChunkCoord::new(0, 0, 0), &params(16), &mut occ);
        let first = marcher.finish();
        marcher.march_chunk(&field, ChunkCoord::new(0, 0, 0), &params(16), &mut occ);
        assert_eq!(marcher.finish(), first);
    }
}
