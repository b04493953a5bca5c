//! Noise-based height map generation

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::voxel::heightmap::HeightMap;

/// Parameters controlling height map generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    pub seed: u32,
    pub scale: f32,        // Horizontal scale in cells (larger = smoother)
    pub base_height: f32,  // Lowest elevation
    pub height_scale: f32, // Elevation range above base_height
    pub octaves: u32,      // FBM octaves (detail levels)
    pub persistence: f32,  // FBM persistence (0.5 typical)
    pub lacunarity: f32,   // FBM lacunarity (2.0 typical)
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: 12345,
            scale: 48.0,
            base_height: 2.0,
            height_scale: 10.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// Height map generator using fractal Brownian motion (FBM)
pub struct HeightMapGenerator {
    params: TerrainParams,
    noise: Fbm<Perlin>,
}

impl HeightMapGenerator {
    pub fn new(params: TerrainParams) -> Self {
        let noise = Fbm::<Perlin>::new(params.seed)
            .set_octaves(params.octaves as usize)
            .set_persistence(params.persistence as f64)
            .set_lacunarity(params.lacunarity as f64);

        Self { params, noise }
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Elevation at world position (x, z)
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let nx = (x / self.params.scale) as f64;
        let nz = (z / self.params.scale) as f64;

        // Noise is roughly [-1, 1]
        let normalized = ((self.noise.get([nx, nz]) + 1.0) / 2.0).clamp(0.0, 1.0);
        self.params.base_height + (normalized * self.params.height_scale as f64) as f32
    }

    /// Sample one elevation per cell center.
    pub fn generate(&self, width: u32, depth: u32, cell_size: f32) -> HeightMap {
        HeightMap::from_fn(width, depth, |x, z| {
            self.height_at((x as f32 + 0.5) * cell_size, (z as f32 + 0.5) * cell_size)
        })
    }
}
