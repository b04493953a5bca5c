//! Flat per-layer density grids.

use crate::persist::{PersistError, SaveWriter, SectionId, SectionReader};
use crate::voxel::cell::{DensityCell, GridDims};

/// Per-layer `width × depth` float grids, indexed `z * width + x`.
///
/// Used for solid material and for liquid mass. The grid is never resized
/// after creation; every mutation goes through the edit and flow APIs.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityField {
    width: u32,
    depth: u32,
    layers: Vec<Vec<f32>>,
}

impl DensityField {
    /// Create a zero-filled field.
    pub fn new(width: u32, depth: u32, layer_count: u32) -> Self {
        let len = width as usize * depth as usize;
        Self {
            width,
            depth,
            layers: (0..layer_count).map(|_| vec![0.0; len]).collect(),
        }
    }

    /// Zero-filled field matching grid extents.
    pub fn with_dims(dims: &GridDims) -> Self {
        Self::new(dims.width, dims.depth, dims.layers)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn layer_count(&self) -> u32 {
        self.layers.len() as u32
    }

    /// Check a cell against the field extents.
    pub fn contains(&self, cell: DensityCell) -> bool {
        cell.x >= 0
            && cell.z >= 0
            && cell.layer >= 0
            && (cell.x as u32) < self.width
            && (cell.z as u32) < self.depth
            && (cell.layer as usize) < self.layers.len()
    }

    /// Density at a cell, `None` outside the grid.
    pub fn get(&self, cell: DensityCell) -> Option<f32> {
        if !self.contains(cell) {
            return None;
        }
        Some(self.layers[cell.layer as usize][cell.index(self.width)])
    }

    /// Density at `(x, z)` of a layer with in-range coordinates.
    #[inline]
    pub fn sample(&self, layer: usize, x: u32, z: u32) -> f32 {
        self.layers[layer][z as usize * self.width as usize + x as usize]
    }

    /// Set a cell, clamping to `[0, max]`. Returns whether the stored value changed.
    pub fn set(&mut self, cell: DensityCell, value: f32, max: f32) -> bool {
        if !self.contains(cell) || value.is_nan() {
            return false;
        }
        let idx = cell.index(self.width);
        let slot = &mut self.layers[cell.layer as usize][idx];
        let clamped = value.clamp(0.0, max);
        let changed = *slot != clamped;
        *slot = clamped;
        changed
    }

    /// Add a signed amount, clamping to `[0, max]`.
    ///
    /// Returns the change actually applied, `None` outside the grid.
    /// A NaN amount leaves the cell untouched.
    pub fn add(&mut self, cell: DensityCell, amount: f32, max: f32) -> Option<f32> {
        if !self.contains(cell) {
            return None;
        }
        if amount.is_nan() {
            return Some(0.0);
        }
        let idx = cell.index(self.width);
        let slot = &mut self.layers[cell.layer as usize][idx];
        let old = *slot;
        *slot = (old + amount).clamp(0.0, max.max(old));
        Some(*slot - old)
    }

    /// Read-only view of one layer.
    pub fn layer(&self, layer: usize) -> &[f32] {
        &self.layers[layer]
    }

    /// Mutable view of one layer.
    pub fn layer_mut(&mut self, layer: usize) -> &mut [f32] {
        &mut self.layers[layer]
    }

    /// Set every cell of a layer.
    pub fn fill_layer(&mut self, layer: usize, value: f32) {
        self.layers[layer].fill(value);
    }

    /// Sum over all cells and layers.
    pub fn total_mass(&self) -> f64 {
        self.layers
            .iter()
            .flat_map(|layer| layer.iter())
            .map(|&v| v as f64)
            .sum()
    }

    /// Bytes [`write_section`](DensityField::write_section) emits.
    pub fn encoded_len(&self) -> usize {
        12 + self.layers.len() * (4 + self.width as usize * self.depth as usize * 4)
    }

    /// Write this field as one persistence section.
    pub fn write_section(
        &self,
        writer: &mut SaveWriter,
        id: SectionId,
        version: u32,
    ) -> Result<(), PersistError> {
        writer.begin_section(id, version)?;
        writer.write_u32(self.width)?;
        writer.write_u32(self.depth)?;
        writer.write_u32(self.layer_count())?;
        for layer in &self.layers {
            writer.write_f32_slice(layer)?;
        }
        writer.end_section()
    }

    /// Overwrite this field from a section written by [`write_section`].
    ///
    /// A section with different grid extents is rejected and leaves the
    /// field untouched.
    ///
    /// [`write_section`]: DensityField::write_section
    pub fn read_section(&mut self, reader: &mut SectionReader<'_>) -> Result<(), PersistError> {
        let width = reader.read_u32()?;
        let depth = reader.read_u32()?;
        let layer_count = reader.read_u32()?;
        if width != self.width || depth != self.depth || layer_count != self.layer_count() {
            return Err(PersistError::LayoutMismatch(format!(
                "section holds {}x{}x{}, field is {}x{}x{}",
                width, depth, layer_count, self.width, self.depth, self.layer_count()
            )));
        }

        let mut loaded = Vec::with_capacity(layer_count as usize);
        for _ in 0..layer_count {
            let values = reader.read_f32_vec()?;
            if values.len() != self.width as usize * self.depth as usize {
                return Err(PersistError::LayoutMismatch(format!(
                    "layer holds {} values, expected {}",
                    values.len(),
                    self.width as usize * self.depth as usize
                )));
            }
            loaded.push(values);
        }
        self.layers = loaded;
        Ok(())
    }
}
