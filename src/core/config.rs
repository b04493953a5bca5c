//! Terrain configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Full terrain configuration. Grid dimensions are fixed for the lifetime of
/// a world; density fields are never resized after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Cells along X.
    pub width: u32,
    /// Cells along Z.
    pub depth: u32,
    /// Number of stacked layers.
    pub layers: u32,
    /// Horizontal size of one cell in world units.
    pub cell_size: f32,
    /// Vertical thickness of one layer in world units.
    pub cell_height: f32,
    /// Cells per chunk side. Same for every layer.
    pub chunk_dim: u32,

    /// Marching-squares mesher parameters.
    pub mesher: MesherConfig,
    /// Liquid cellular automaton parameters.
    pub liquid: LiquidConfig,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            width: 128,
            depth: 128,
            layers: 16,
            cell_size: 1.0,
            cell_height: 1.0,
            chunk_dim: 16,
            mesher: MesherConfig::default(),
            liquid: LiquidConfig::default(),
        }
    }
}

/// Mesher parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MesherConfig {
    /// Density at or above which a solid sample counts as filled.
    pub iso_level: f32,
    /// Maximum chunks remeshed per tick.
    pub remesh_budget: usize,
    /// Skip solid caps hidden by a solid cell in the layer above.
    pub occlusion_checks: bool,
    /// Build a collision mesh alongside the render mesh.
    pub collision: bool,
}

impl Default for MesherConfig {
    fn default() -> Self {
        Self {
            iso_level: 0.5,
            remesh_budget: 256,
            occlusion_checks: true,
            collision: false,
        }
    }
}

/// Liquid flow parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidConfig {
    /// Whether the solver advances on `tick`.
    pub enabled: bool,
    /// Sub-steps per second of accumulated time.
    pub tick_rate: f32,
    /// Nominal full-cell mass.
    pub max_value: f32,
    /// Extra mass a cell may hold under pressure.
    pub max_compression: f32,
    /// Largest horizontal transfer per cell pair per sub-step.
    pub max_flow: f32,
    /// Scales horizontal equalisation speed, in (0, 1].
    pub flow_multiplier: f32,
    /// Masses and transfers below this are dropped.
    pub evaporation_epsilon: f32,
    /// Solid density above which a cell blocks liquid.
    pub solid_iso_level: f32,
    /// Layer acting as a static sea: flow into it is absorbed.
    pub water_plane_layer: Option<u32>,
    /// Iso level used when meshing the liquid field.
    pub iso_level: f32,
}

impl Default for LiquidConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_rate: 30.0,
            max_value: 1.0,
            max_compression: 0.02,
            max_flow: 1.0,
            flow_multiplier: 1.0,
            evaporation_epsilon: 0.0001,
            solid_iso_level: 0.5,
            water_plane_layer: None,
            iso_level: 0.1,
        }
    }
}

impl LiquidConfig {
    /// Seconds per sub-step.
    pub fn step_interval(&self) -> f32 {
        1.0 / self.tick_rate
    }

    /// Upper bound on a single cell's mass.
    pub fn mass_limit(&self) -> f32 {
        self.max_value + self.max_compression
    }
}

impl TerrainConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TerrainConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Number of chunks along X.
    pub fn chunks_x(&self) -> u32 {
        self.width.div_ceil(self.chunk_dim)
    }

    /// Number of chunks along Z.
    pub fn chunks_z(&self) -> u32 {
        self.depth.div_ceil(self.chunk_dim)
    }

    /// Total chunk count over all layers.
    pub fn chunk_count(&self) -> usize {
        self.chunks_x() as usize * self.chunks_z() as usize * self.layers as usize
    }

    /// Reject configurations the core cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.width < 2 || self.depth < 2 || self.layers == 0 {
            return Err(Error::Config(format!(
                "grid must be at least 2x2 cells with one layer, got {}x{}x{}",
                self.width, self.depth, self.layers
            )));
        }
        if self.chunk_dim == 0 {
            return Err(Error::Config("chunk_dim must be positive".into()));
        }
        if !(self.cell_size > 0.0) || !(self.cell_height > 0.0) {
            return Err(Error::Config("cell_size and cell_height must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.mesher.iso_level) {
            return Err(Error::Config(format!("mesher iso_level {} outside [0, 1]", self.mesher.iso_level)));
        }

        let liquid = &self.liquid;
        if !(liquid.tick_rate > 0.0) {
            return Err(Error::Config("liquid tick_rate must be positive".into()));
        }
        if !(liquid.flow_multiplier > 0.0 && liquid.flow_multiplier <= 1.0) {
            return Err(Error::Config(format!(
                "liquid flow_multiplier {} outside (0, 1]",
                liquid.flow_multiplier
            )));
        }
        if liquid.max_value <= 0.0 || liquid.max_compression < 0.0 || liquid.max_flow <= 0.0 {
            return Err(Error::Config("liquid max_value/max_flow must be positive, max_compression non-negative".into()));
        }
        if liquid.evaporation_epsilon < 0.0 {
            return Err(Error::Config("liquid evaporation_epsilon must be non-negative".into()));
        }
        if let Some(plane) = liquid.water_plane_layer {
            if plane >= self.layers {
                return Err(Error::Config(format!(
                    "water plane layer {} outside {} layers",
                    plane, self.layers
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = TerrainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunks_x(), 8);
        assert_eq!(config.chunk_count(), 8 * 8 * 16);
    }

    #[test]
    fn test_partial_chunks_round_up() {
        let config = TerrainConfig { width: 33, depth: 16, chunk_dim: 16, ..Default::default() };
        assert_eq!(config.chunks_x(), 3);
        assert_eq!(config.chunks_z(), 1);
    }

    #[test]
    fn test_json_defaults_fill_missing_fields() {
        let config = TerrainConfig::from_json_str(r#"{ "width": 64, "liquid": { "tick_rate": 60.0 } }"#)
            .expect("valid config");
        assert_eq!(config.width, 64);
        assert_eq!(config.depth, 128);
        assert_eq!(config.liquid.tick_rate, 60.0);
        assert_eq!(config.liquid.max_value, 1.0);
        assert_eq!(config.mesher.remesh_budget, 256);
    }

    #[test]
    fn test_rejects_bad_flow_multiplier() {
        let mut config = TerrainConfig::default();
        config.liquid.flow_multiplier = 1.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_water_plane_out_of_range() {
        let mut config = TerrainConfig::default();
        config.liquid.water_plane_layer = Some(config.layers);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_chunk_dim() {
        let config = TerrainConfig { chunk_dim: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_through_json() {
        let config = TerrainConfig { layers: 4, ..Default::default() };
        let json = serde_json::to_string(&config).expect("serialize");
        let back = TerrainConfig::from_json_str(&json).expect("parse");
        assert_eq!(back, config);
    }
}
