//! Cell and chunk addressing for the layered density grid

use glam::Vec3;

use crate::core::config::TerrainConfig;

/// Fixed grid extents shared by density fields, dirty tracking and meshing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridDims {
    pub width: u32,
    pub depth: u32,
    pub layers: u32,
    pub chunk_dim: u32,
}

impl GridDims {
    pub fn new(width: u32, depth: u32, layers: u32, chunk_dim: u32) -> Self {
        Self { width, depth, layers, chunk_dim }
    }

    /// Extents of the grid described by a terrain config.
    pub fn from_config(config: &TerrainConfig) -> Self {
        Self::new(config.width, config.depth, config.layers, config.chunk_dim)
    }

    /// Cells per layer.
    pub fn layer_len(&self) -> usize {
        self.width as usize * self.depth as usize
    }

    pub fn chunks_x(&self) -> u32 {
        self.width.div_ceil(self.chunk_dim)
    }

    pub fn chunks_z(&self) -> u32 {
        self.depth.div_ceil(self.chunk_dim)
    }

    /// Chunks over all layers.
    pub fn chunk_count(&self) -> usize {
        self.chunks_x() as usize * self.chunks_z() as usize * self.layers as usize
    }
}

/// One grid cell: `(x, z)` inside layer `layer`.
///
/// A plain coordinate. Components are signed so that positions just outside
/// the grid can be represented and rejected by [`DensityCell::in_bounds`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DensityCell {
    pub x: i32,
    pub z: i32,
    pub layer: i32,
}

impl DensityCell {
    pub fn new(x: i32, z: i32, layer: i32) -> Self {
        Self { x, z, layer }
    }

    /// Cell containing a world position. The layer is `floor(y / cell_height)`.
    pub fn from_world(pos: Vec3, cell_size: f32, cell_height: f32) -> Self {
        Self {
            x: (pos.x / cell_size).floor() as i32,
            z: (pos.z / cell_size).floor() as i32,
            layer: (pos.y / cell_height).floor() as i32,
        }
    }

    /// Check against grid extents.
    pub fn in_bounds(&self, dims: &GridDims) -> bool {
        self.x >= 0
            && self.z >= 0
            && self.layer >= 0
            && (self.x as u32) < dims.width
            && (self.z as u32) < dims.depth
            && (self.layer as u32) < dims.layers
    }

    /// Whether the `(x, z)` square of the given radius around this cell
    /// overlaps the grid horizontally.
    pub fn touches_grid(&self, radius: i32, dims: &GridDims) -> bool {
        let x = i64::from(self.x);
        let z = i64::from(self.z);
        let r = i64::from(radius);
        x + r >= 0 && z + r >= 0 && x - r < i64::from(dims.width) && z - r < i64::from(dims.depth)
    }

    /// Linear index inside one layer: `z * width + x`.
    ///
    /// Only meaningful for in-bounds cells.
    pub fn index(&self, width: u32) -> usize {
        self.z as usize * width as usize + self.x as usize
    }

    /// World-space center of the cell.
    pub fn world_center(&self, cell_size: f32, cell_height: f32) -> Vec3 {
        Vec3::new(
            (self.x as f32 + 0.5) * cell_size,
            (self.layer as f32 + 0.5) * cell_height,
            (self.z as f32 + 0.5) * cell_size,
        )
    }

    /// Same cell shifted within its layer.
    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz, self.layer)
    }

    /// Same `(x, z)` on another layer.
    pub fn with_layer(&self, layer: i32) -> Self {
        Self::new(self.x, self.z, layer)
    }
}

/// Chunk-granularity address: `(chunk_x, layer, chunk_z)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub layer: i32,
    pub z: i32,
}

impl ChunkCoord {
    /// Create a new chunk coordinate
    pub fn new(x: i32, layer: i32, z: i32) -> Self {
        Self { x, layer, z }
    }

    /// Chunk containing a cell.
    pub fn from_cell(cell: DensityCell, chunk_dim: u32) -> Self {
        let dim = chunk_dim as i32;
        Self {
            x: cell.x.div_euclid(dim),
            layer: cell.layer,
            z: cell.z.div_euclid(dim),
        }
    }

    /// Check against the chunk grid.
    pub fn is_valid(&self, dims: &GridDims) -> bool {
        self.x >= 0
            && self.z >= 0
            && self.layer >= 0
            && (self.x as u32) < dims.chunks_x()
            && (self.z as u32) < dims.chunks_z()
            && (self.layer as u32) < dims.layers
    }

    /// Flat index into a `layer, z, x` ordered chunk array. Valid coords only.
    pub fn index(&self, dims: &GridDims) -> usize {
        let cx = dims.chunks_x() as usize;
        let cz = dims.chunks_z() as usize;
        (self.layer as usize * cz + self.z as usize) * cx + self.x as usize
    }

    /// First cell (minimum x, z) covered by this chunk.
    pub fn origin_cell(&self, chunk_dim: u32) -> DensityCell {
        let dim = chunk_dim as i32;
        DensityCell::new(self.x * dim, self.z * dim, self.layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> GridDims {
        GridDims::new(40, 20, 4, 16)
    }

    #[test]
    fn test_from_world() {
        let cell = DensityCell::from_world(Vec3::new(5.5, 2.9, 3.1), 1.0, 1.0);
        assert_eq!(cell, DensityCell::new(5, 3, 2));

        let cell = DensityCell::from_world(Vec3::new(5.0, 2.0, 3.0), 2.0, 0.5);
        assert_eq!(cell, DensityCell::new(2, 1, 4));

        let below = DensityCell::from_world(Vec3::new(0.0, -0.1, 0.0), 1.0, 1.0);
        assert_eq!(below.layer, -1);
    }

    #[test]
    fn test_in_bounds() {
        let d = dims();
        assert!(DensityCell::new(0, 0, 0).in_bounds(&d));
        assert!(DensityCell::new(39, 19, 3).in_bounds(&d));
        assert!(!DensityCell::new(40, 0, 0).in_bounds(&d));
        assert!(!DensityCell::new(0, -1, 0).in_bounds(&d));
        assert!(!DensityCell::new(0, 0, 4).in_bounds(&d));
    }

    #[test]
    fn test_touches_grid() {
        let d = dims();
        assert!(DensityCell::new(-1, 5, 0).touches_grid(1, &d));
        assert!(DensityCell::new(40, 20, 0).touches_grid(1, &d));
        assert!(!DensityCell::new(40, 5, 0).touches_grid(0, &d));
        assert!(!DensityCell::new(-2, 5, 0).touches_grid(1, &d));
        assert!(!DensityCell::new(i32::MAX, 0, 0).touches_grid(1, &d));
        assert!(!DensityCell::new(0, i32::MIN, 0).touches_grid(1, &d));
    }

    #[test]
    fn test_index_and_center() {
        let cell = DensityCell::new(3, 2, 1);
        assert_eq!(cell.index(40), 83);
        assert_eq!(cell.world_center(2.0, 1.0), Vec3::new(7.0, 1.5, 5.0));
    }

    #[test]
    fn test_chunk_from_cell() {
        assert_eq!(ChunkCoord::from_cell(DensityCell::new(15, 16, 2), 16), ChunkCoord::new(0, 2, 1));
        assert_eq!(ChunkCoord::from_cell(DensityCell::new(-1, 0, 0), 16), ChunkCoord::new(-1, 0, 0));
    }

    #[test]
    fn test_chunk_validity_and_index() {
        let d = dims();
        assert_eq!(d.chunks_x(), 3);
        assert_eq!(d.chunks_z(), 2);
        assert!(ChunkCoord::new(2, 3, 1).is_valid(&d));
        assert!(!ChunkCoord::new(3, 0, 0).is_valid(&d));
        assert!(!ChunkCoord::new(0, 4, 0).is_valid(&d));
        assert_eq!(ChunkCoord::new(0, 0, 0).index(&d), 0);
        assert_eq!(ChunkCoord::new(2, 3, 1).index(&d), d.chunk_count() - 1);
    }
}
