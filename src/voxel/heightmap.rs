//! 2D elevation input used to initialise the solid field.

use crate::core::error::Error;
use crate::core::types::Result;

/// Flat `width × depth` elevation grid in world units, indexed `z * width + x`.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightMap {
    width: u32,
    depth: u32,
    heights: Vec<f32>,
}

impl HeightMap {
    /// Wrap existing elevations. Fails when the length does not match.
    pub fn new(width: u32, depth: u32, heights: Vec<f32>) -> Result<Self> {
        let expected = width as usize * depth as usize;
        if heights.len() != expected {
            return Err(Error::HeightMap(format!(
                "{} heights for a {}x{} map (expected {})",
                heights.len(), width, depth, expected
            )));
        }
        Ok(Self { width, depth, heights })
    }

    /// Constant elevation everywhere.
    pub fn flat(width: u32, depth: u32, height: f32) -> Self {
        Self {
            width,
            depth,
            heights: vec![height; width as usize * depth as usize],
        }
    }

    /// Build from a function of `(x, z)`.
    pub fn from_fn(width: u32, depth: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let mut heights = Vec::with_capacity(width as usize * depth as usize);
        for z in 0..depth {
            for x in 0..width {
                heights.push(f(x, z));
            }
        }
        Self { width, depth, heights }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Elevation at `(x, z)`, `None` outside the map.
    pub fn sample(&self, x: u32, z: u32) -> Option<f32> {
        if x >= self.width || z >= self.depth {
            return None;
        }
        Some(self.heights[z as usize * self.width as usize + x as usize])
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// (min, max) elevation.
    pub fn range(&self) -> (f32, f32) {
        self.heights.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| {
            (lo.min(h), hi.max(h))
        })
    }
}

/// Density of `layer` at a column with the given elevation.
///
/// Each layer spans `[layer * cell_height, (layer + 1) * cell_height)`; its
/// iso height (density 0.5) sits at the middle of that span. Below the span
/// the layer is empty, above it full, with a linear ramp in between.
pub fn layer_density(elevation: f32, layer: u32, cell_height: f32) -> f32 {
    let bottom = layer as f32 * cell_height;
    ((elevation - bottom) / cell_height).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_length() {
        assert!(HeightMap::new(2, 2, vec![0.0; 4]).is_ok());
        assert!(matches!(HeightMap::new(2, 2, vec![0.0; 3]), Err(Error::HeightMap(_))));
    }

    #[test]
    fn test_from_fn_layout() {
        let map = HeightMap::from_fn(3, 2, |x, z| (x + 10 * z) as f32);
        assert_eq!(map.sample(2, 1), Some(12.0));
        assert_eq!(map.heights()[4], 11.0);
        assert_eq!(map.sample(3, 0), None);
        assert_eq!(map.range(), (0.0, 12.0));
    }

    #[test]
    fn test_layer_density_ramp() {
        assert_eq!(layer_density(0.0, 0, 1.0), 0.0);
        assert_eq!(layer_density(0.5, 0, 1.0), 0.5);
        assert_eq!(layer_density(3.0, 1, 1.0), 1.0);
        assert_eq!(layer_density(2.25, 2, 1.0), 0.25);
        assert_eq!(layer_density(2.25, 3, 1.0), 0.0);
        assert_eq!(layer_density(3.0, 1, 2.0), 0.5);
    }
}
