//! Per-layer occlusion flags shared between neighbouring layers.

/// One flag per marching cell per layer: `true` where all four corners of
/// that cell are solid, making it an opaque cap for the layer below.
///
/// Layers are looked up by index, so a layer reads the one above it with
/// [`OcclusionGrid::is_capped`] instead of holding a reference to it.
#[derive(Clone, Debug, PartialEq)]
pub struct OcclusionGrid {
    width: u32,
    depth: u32,
    layers: Vec<Vec<bool>>,
}

impl OcclusionGrid {
    pub fn new(width: u32, depth: u32, layer_count: u32) -> Self {
        let len = width as usize * depth as usize;
        Self {
            width,
            depth,
            layers: (0..layer_count).map(|_| vec![false; len]).collect(),
        }
    }

    pub fn layer_count(&self) -> u32 {
        self.layers.len() as u32
    }

    fn index(&self, layer: i32, x: i32, z: i32) -> Option<(usize, usize)> {
        if layer < 0
            || x < 0
            || z < 0
            || layer as usize >= self.layers.len()
            || x as u32 >= self.width
            || z as u32 >= self.depth
        {
            return None;
        }
        Some((layer as usize, z as usize * self.width as usize + x as usize))
    }

    /// Flag of a marching cell, `false` outside the grid.
    pub fn get(&self, layer: i32, x: i32, z: i32) -> bool {
        self.index(layer, x, z)
            .is_some_and(|(l, i)| self.layers[l][i])
    }

    pub fn set(&mut self, layer: i32, x: i32, z: i32, solid: bool) {
        if let Some((l, i)) = self.index(layer, x, z) {
            self.layers[l][i] = solid;
        }
    }

    /// Whether the layer above `layer` has a solid cap over this cell.
    pub fn is_capped(&self, layer: i32, x: i32, z: i32) -> bool {
        self.get(layer + 1, x, z)
    }

    /// Number of solid flags on a layer.
    pub fn solid_count(&self, layer: u32) -> usize {
        self.layers
            .get(layer as usize)
            .map_or(0, |flags| flags.iter().filter(|&&f| f).count())
    }

    pub fn clear(&mut self) {
        for layer in &mut self.layers {
            layer.fill(false);
        }
    }
}
