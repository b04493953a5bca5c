//! Batched solid density edits.

use crate::core::error::Error;
use crate::core::types::{Result, Vec3};
use crate::voxel::cell::{ChunkCoord, DensityCell, GridDims};
use crate::voxel::density::DensityField;
use crate::voxel::dirty::DirtyTracker;
use crate::voxel::heightmap::{layer_density, HeightMap};

/// Falloff applied to the eight cells around a fill target.
pub const FILL_FALLOFF: f32 = 0.5;

/// Solid density never leaves `[0, 1]`.
pub const SOLID_MAX: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq)]
struct PendingEdit {
    cell: DensityCell,
    amount: f32,
}

/// Queue of signed solid deltas, applied once per tick.
#[derive(Debug)]
pub struct SolidEditQueue {
    dims: GridDims,
    cell_size: f32,
    cell_height: f32,
    pending: Vec<PendingEdit>,
}

impl SolidEditQueue {
    pub fn new(dims: GridDims, cell_size: f32, cell_height: f32) -> Self {
        Self {
            dims,
            cell_size,
            cell_height,
            pending: Vec::new(),
        }
    }

    /// Queue a delta at the cell containing `position`.
    ///
    /// Non-finite amounts, positions whose layer falls outside the grid and
    /// positions whose 3×3 footprint misses the grid are dropped.
    pub fn add_density(&mut self, position: Vec3, amount: f32) {
        if !amount.is_finite() {
            log::trace!("Dropping solid edit at {:?}: amount {} is not finite", position, amount);
            return;
        }
        let cell = DensityCell::from_world(position, self.cell_size, self.cell_height);
        if cell.layer < 0 || cell.layer as u32 >= self.dims.layers {
            log::trace!("Dropping solid edit at {:?}: layer {} out of range", position, cell.layer);
            return;
        }
        if !cell.touches_grid(1, &self.dims) {
            log::trace!("Dropping solid edit at {:?}: outside the grid", position);
            return;
        }
        self.pending.push(PendingEdit { cell, amount });
    }

    /// Queued edits not yet applied.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drain the queue into the field.
    ///
    /// Fills touch the 3×3 neighbourhood (center at full strength, the rest
    /// at [`FILL_FALLOFF`]), digs only the target cell. Every cell whose value
    /// changed is reported to `dirty` with its 5×5 chunk neighbourhood and
    /// returned in application order.
    pub fn update(&mut self, field: &mut DensityField, dirty: &mut DirtyTracker) -> Vec<DensityCell> {
        let mut changed = Vec::new();

        for edit in self.pending.drain(..) {
            let radius = if edit.amount > 0.0 { 1 } else { 0 };
            for dz in -radius..=radius {
                for dx in -radius..=radius {
                    let weight = if dx == 0 && dz == 0 { 1.0 } else { FILL_FALLOFF };
                    let cell = edit.cell.offset(dx, dz);
                    match field.add(cell, edit.amount * weight, SOLID_MAX) {
                        Some(delta) if delta != 0.0 => {
                            dirty.mark_cell_neighbourhood(cell);
                            changed.push(cell);
                        }
                        _ => {}
                    }
                }
            }
        }

        changed
    }

    /// Initialise every layer from an elevation map.
    ///
    /// Each layer compares the column elevation against its own height band
    /// (see [`layer_density`]). All chunks are marked dirty. Any edits still
    /// queued are kept and applied on the next [`update`](Self::update).
    pub fn apply_height_map(
        &self,
        field: &mut DensityField,
        heightmap: &HeightMap,
        dirty: &mut DirtyTracker,
    ) -> Result<()> {
        if heightmap.width() != field.width() || heightmap.depth() != field.depth() {
            return Err(Error::HeightMap(format!(
                "height map is {}x{}, grid is {}x{}",
                heightmap.width(),
                heightmap.depth(),
                field.width(),
                field.depth()
            )));
        }

        for layer in 0..field.layer_count() {
            let values = field.layer_mut(layer as usize);
            for (value, &elevation) in values.iter_mut().zip(heightmap.heights()) {
                *value = layer_density(elevation, layer, self.cell_height);
            }
        }

        for layer in 0..self.dims.layers as i32 {
            for z in 0..self.dims.chunks_z() as i32 {
                for x in 0..self.dims.chunks_x() as i32 {
                    dirty.mark_chunk_dirty(ChunkCoord::new(x, layer, z));
                }
            }
        }

        let (lo, hi) = heightmap.range();
        log::info!(
            "Applied {}x{} height map (elevation {:.2}..{:.2}) to {} layers",
            heightmap.width(),
            heightmap.depth(),
            lo,
            hi,
            field.layer_count()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (SolidEditQueue, DensityField, DirtyTracker) {
        let dims = GridDims::new(32, 32, 4, 16);
        (
            SolidEditQueue::new(dims, 1.0, 1.0),
            DensityField::with_dims(&dims),
            DirtyTracker::new(16),
        )
    }

    #[test]
    fn test_fill_weights_neighbourhood() {
        let (mut queue, mut field, mut dirty) = setup();
        queue.add_density(Vec3::new(5.5, 2.5, 5.5), 0.4);
        let changed = queue.update(&mut field, &mut dirty);

        assert_eq!(changed.len(), 9);
        assert_eq!(field.get(DensityCell::new(5, 5, 2)), Some(0.4));
        assert_eq!(field.get(DensityCell::new(4, 6, 2)), Some(0.2));
        assert_eq!(field.get(DensityCell::new(6, 5, 2)), Some(0.2));
        assert_eq!(field.get(DensityCell::new(7, 5, 2)), Some(0.0));
        assert_eq!(field.get(DensityCell::new(5, 5, 1)), Some(0.0));
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn test_dig_is_single_cell() {
        let (mut queue, mut field, mut dirty) = setup();
        for layer in 0..4 {
            field.fill_layer(layer, 1.0);
        }
        queue.add_density(Vec3::new(5.5, 1.5, 5.5), -0.75);
        let changed = queue.update(&mut field, &mut dirty);

        assert_eq!(changed, vec![DensityCell::new(5, 5, 1)]);
        assert_eq!(field.get(DensityCell::new(5, 5, 1)), Some(0.25));
        assert_eq!(field.get(DensityCell::new(4, 5, 1)), Some(1.0));
    }

    #[test]
    fn test_repeated_edits_stay_clamped() {
        let (mut queue, mut field, mut dirty) = setup();
        for _ in 0..10 {
            queue.add_density(Vec3::new(5.5, 0.5, 5.5), 3.0);
        }
        queue.update(&mut field, &mut dirty);
        for _ in 0..10 {
            queue.add_density(Vec3::new(6.5, 0.5, 5.5), -7.0);
            queue.add_density(Vec3::new(6.5, 0.5, 5.5), 0.3);
        }
        queue.update(&mut field, &mut dirty);

        for &v in field.layer(0) {
            assert!((0.0..=1.0).contains(&v), "density {} escaped [0, 1]", v);
        }
    }

    #[test]
    fn test_unchanged_cell_not_dirty() {
        let (mut queue, mut field, mut dirty) = setup();
        field.fill_layer(2, 1.0);
        queue.add_density(Vec3::new(5.5, 2.5, 5.5), 1.0);
        let changed = queue.update(&mut field, &mut dirty);
        assert!(changed.is_empty());
        assert!(!dirty.has_dirty());
    }

    #[test]
    fn test_out_of_range_layer_ignored() {
        let (mut queue, mut field, mut dirty) = setup();
        queue.add_density(Vec3::new(5.5, 4.5, 5.5), 1.0);
        queue.add_density(Vec3::new(5.5, -0.5, 5.5), 1.0);
        assert_eq!(queue.pending_count(), 0);
        assert!(queue.update(&mut field, &mut dirty).is_empty());
    }

    #[test]
    fn test_far_position_ignored() {
        let (mut queue, mut field, mut dirty) = setup();
        queue.add_density(Vec3::new(1.0e10, 0.5, 0.5), 1.0);
        queue.add_density(Vec3::new(0.5, 0.5, -1.0e10), 1.0);
        queue.add_density(Vec3::new(-1.5, 0.5, 0.5), 1.0);
        assert_eq!(queue.pending_count(), 0);
        assert!(queue.update(&mut field, &mut dirty).is_empty());
        assert!(!dirty.has_dirty());
    }

    #[test]
    fn test_fill_just_outside_grid_reaches_edge() {
        let (mut queue, mut field, mut dirty) = setup();
        queue.add_density(Vec3::new(-0.5, 0.5, 5.5), 1.0);
        let changed = queue.update(&mut field, &mut dirty);
        assert_eq!(changed.len(), 3);
        assert_eq!(field.get(DensityCell::new(0, 5, 0)), Some(0.5));
    }

    #[test]
    fn test_non_finite_amount_ignored() {
        let (mut queue, mut field, mut dirty) = setup();
        queue.add_density(Vec3::new(5.5, 0.5, 5.5), f32::NAN);
        queue.add_density(Vec3::new(5.5, 0.5, 5.5), f32::INFINITY);
        assert_eq!(queue.pending_count(), 0);
        assert!(queue.update(&mut field, &mut dirty).is_empty());
        assert_eq!(field.get(DensityCell::new(5, 5, 0)), Some(0.0));
    }

    #[test]
    fn test_fill_at_grid_edge_clips() {
        let (mut queue, mut field, mut dirty) = setup();
        queue.add_density(Vec3::new(0.5, 0.5, 0.5), 1.0);
        let changed = queue.update(&mut field, &mut dirty);
        assert_eq!(changed.len(), 4);
        assert_eq!(field.get(DensityCell::new(0, 0, 0)), Some(1.0));
        assert_eq!(field.get(DensityCell::new(1, 1, 0)), Some(0.5));
    }

    #[test]
    fn test_fill_marks_same_layer_and_below() {
        let (mut queue, mut field, mut dirty) = setup();
        queue.add_density(Vec3::new(5.5, 2.5, 5.5), 1.0);
        queue.update(&mut field, &mut dirty);

        assert!(dirty.is_chunk_dirty(&ChunkCoord::new(0, 2, 0)));
        assert!(dirty.is_chunk_dirty(&ChunkCoord::new(1, 2, 1)));
        assert!(dirty.is_chunk_dirty(&ChunkCoord::new(0, 1, 0)));
        assert!(!dirty.is_chunk_dirty(&ChunkCoord::new(0, 3, 0)));
    }

    #[test]
    fn test_height_map_ramp() {
        let (queue, mut field, mut dirty) = setup();
        let map = HeightMap::from_fn(32, 32, |x, _| if x < 16 { 2.5 } else { 0.0 });
        queue.apply_height_map(&mut field, &map, &mut dirty).expect("apply");

        assert_eq!(field.get(DensityCell::new(3, 3, 0)), Some(1.0));
        assert_eq!(field.get(DensityCell::new(3, 3, 1)), Some(1.0));
        assert_eq!(field.get(DensityCell::new(3, 3, 2)), Some(0.5));
        assert_eq!(field.get(DensityCell::new(3, 3, 3)), Some(0.0));
        assert_eq!(field.get(DensityCell::new(20, 3, 0)), Some(0.0));
        assert_eq!(dirty.dirty_chunk_count(), 2 * 2 * 4);
    }

    #[test]
    fn test_height_map_size_mismatch() {
        let (queue, mut field, mut dirty) = setup();
        let map = HeightMap::flat(16, 32, 1.0);
        assert!(matches!(
            queue.apply_height_map(&mut field, &map, &mut dirty),
            Err(Error::HeightMap(_))
        ));
    }
}
