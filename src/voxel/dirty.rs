//! Dirty cell and chunk tracking between edits and the mesher.

use std::collections::HashSet;

use crate::voxel::cell::{ChunkCoord, DensityCell};

/// Chunk radius marked around a changed cell on its own layer.
pub const NEIGHBOURHOOD_RADIUS: i32 = 2;

/// Tracks which cells changed and which chunks need a remesh.
///
/// Edits report individual cells; the tracker expands them to chunk
/// granularity. The world drains [`take_dirty_chunks`] into the mesher once
/// per tick.
///
/// [`take_dirty_chunks`]: DirtyTracker::take_dirty_chunks
#[derive(Debug)]
pub struct DirtyTracker {
    chunk_dim: u32,
    /// Cells changed since the last drain, in report order
    dirty_cells: Vec<DensityCell>,
    /// Chunks needing a remesh
    dirty_chunks: HashSet<ChunkCoord>,
}

impl DirtyTracker {
    pub fn new(chunk_dim: u32) -> Self {
        Self {
            chunk_dim,
            dirty_cells: Vec::new(),
            dirty_chunks: HashSet::new(),
        }
    }

    pub fn chunk_dim(&self) -> u32 {
        self.chunk_dim
    }

    /// Record a solid edit: 5×5 chunks around the cell on its own layer,
    /// plus the chunks below whose occlusion culling reads this layer.
    pub fn mark_cell_neighbourhood(&mut self, cell: DensityCell) {
        self.dirty_cells.push(cell);

        let center = ChunkCoord::from_cell(cell, self.chunk_dim);
        for dz in -NEIGHBOURHOOD_RADIUS..=NEIGHBOURHOOD_RADIUS {
            for dx in -NEIGHBOURHOOD_RADIUS..=NEIGHBOURHOOD_RADIUS {
                self.mark_chunk_dirty(ChunkCoord::new(center.x + dx, center.layer, center.z + dz));
            }
        }
        self.mark_stencil_chunks(cell.with_layer(cell.layer - 1));
    }

    /// Record a cell and mark only the chunks whose marching squares sample it.
    pub fn mark_cell_stencil(&mut self, cell: DensityCell) {
        self.dirty_cells.push(cell);
        self.mark_stencil_chunks(cell);
    }

    // Marching square (x, z) samples cells x..=x+1, z..=z+1.
    fn mark_stencil_chunks(&mut self, cell: DensityCell) {
        let lo = ChunkCoord::from_cell(cell.offset(-1, -1), self.chunk_dim);
        let hi = ChunkCoord::from_cell(cell, self.chunk_dim);
        for z in lo.z..=hi.z {
            for x in lo.x..=hi.x {
                self.mark_chunk_dirty(ChunkCoord::new(x, cell.layer, z));
            }
        }
    }

    /// Mark a specific chunk as dirty.
    pub fn mark_chunk_dirty(&mut self, coord: ChunkCoord) {
        self.dirty_chunks.insert(coord);
    }

    /// Take all dirty chunks and clear the set.
    pub fn take_dirty_chunks(&mut self) -> Vec<ChunkCoord> {
        self.dirty_chunks.drain().collect()
    }

    /// Take all dirty cells and clear the list.
    pub fn take_dirty_cells(&mut self) -> Vec<DensityCell> {
        std::mem::take(&mut self.dirty_cells)
    }

    pub fn has_dirty(&self) -> bool {
        !self.dirty_chunks.is_empty() || !self.dirty_cells.is_empty()
    }

    pub fn is_chunk_dirty(&self, coord: &ChunkCoord) -> bool {
        self.dirty_chunks.contains(coord)
    }

    pub fn dirty_chunk_count(&self) -> usize {
        self.dirty_chunks.len()
    }

    pub fn dirty_cell_count(&self) -> usize {
        self.dirty_cells.len()
    }

    /// Clear all dirty state.
    pub fn clear(&mut self) {
        self.dirty_cells.clear();
        self.dirty_chunks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let tracker = DirtyTracker::new(16);
        assert!(!tracker.has_dirty());
        assert_eq!(tracker.dirty_chunk_count(), 0);
        assert_eq!(tracker.chunk_dim(), 16);
    }

    #[test]
    fn test_neighbourhood_marks_five_by_five() {
        let mut tracker = DirtyTracker::new(16);
        tracker.mark_cell_neighbourhood(DensityCell::new(40, 40, 2));

        // 25 on the same layer, 1 stencil chunk on the layer below
        assert_eq!(tracker.dirty_chunk_count(), 26);
        assert!(tracker.is_chunk_dirty(&ChunkCoord::new(0, 2, 0)));
        assert!(tracker.is_chunk_dirty(&ChunkCoord::new(4, 2, 4)));
        assert!(!tracker.is_chunk_dirty(&ChunkCoord::new(5, 2, 2)));
        assert!(tracker.is_chunk_dirty(&ChunkCoord::new(2, 1, 2)));
        assert!(!tracker.is_chunk_dirty(&ChunkCoord::new(2, 3, 2)));
        assert_eq!(tracker.dirty_cell_count(), 1);
    }

    #[test]
    fn test_stencil_at_chunk_corner() {
        let mut tracker = DirtyTracker::new(16);
        tracker.mark_cell_stencil(DensityCell::new(16, 32, 0));
        let mut chunks = tracker.take_dirty_chunks();
        chunks.sort();
        assert_eq!(
            chunks,
            vec![
                ChunkCoord::new(0, 0, 1),
                ChunkCoord::new(0, 0, 2),
                ChunkCoord::new(1, 0, 1),
                ChunkCoord::new(1, 0, 2),
            ]
        );
    }

    #[test]
    fn test_stencil_inside_chunk() {
        let mut tracker = DirtyTracker::new(16);
        tracker.mark_cell_stencil(DensityCell::new(5, 5, 3));
        assert_eq!(tracker.take_dirty_chunks(), vec![ChunkCoord::new(0, 3, 0)]);
    }

    #[test]
    fn test_repeat_mark_is_one_chunk() {
        let mut tracker = DirtyTracker::new(8);
        let coord = ChunkCoord::new(1, 0, 1);
        tracker.mark_chunk_dirty(coord);
        tracker.mark_chunk_dirty(coord);
        assert_eq!(tracker.dirty_chunk_count(), 1);
    }

    #[test]
    fn test_take_clears() {
        let mut tracker = DirtyTracker::new(8);
        tracker.mark_cell_stencil(DensityCell::new(3, 3, 0));
        assert_eq!(tracker.take_dirty_cells(), vec![DensityCell::new(3, 3, 0)]);
        assert_eq!(tracker.take_dirty_chunks().len(), 1);
        assert!(!tracker.has_dirty());
    }

    #[test]
    fn test_clear() {
        let mut tracker = DirtyTracker::new(8);
        tracker.mark_cell_neighbourhood(DensityCell::new(3, 3, 1));
        tracker.clear();
        assert!(!tracker.has_dirty());
        assert_eq!(tracker.dirty_cell_count(), 0);
    }
}
