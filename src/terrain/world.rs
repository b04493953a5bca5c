//! Terrain world: density fields, edits, liquid flow and meshing in one place

use crate::core::config::{MesherConfig, TerrainConfig};
use crate::core::types::{Result, Vec3};
use crate::mesh::mesher::ChunkMesher;
use crate::persist::{
    section_name, PersistError, SaveReader, SaveWriter, SectionId, LIQUID_DENSITY, SOLID_DENSITY,
    WORLD_INFO,
};
use crate::voxel::cell::{ChunkCoord, DensityCell, GridDims};
use crate::voxel::density::DensityField;
use crate::voxel::dirty::DirtyTracker;
use crate::voxel::edit::{EditCommand, Material, SolidEditQueue};
use crate::voxel::heightmap::HeightMap;
use crate::voxel::water::{LiquidSolver, SubStepReport};

/// Sections a world save may hold.
const MAX_SECTIONS: usize = 8;
/// Version of the density sections.
const DENSITY_VERSION: u32 = 1;
/// Version of the world info section.
const WORLD_INFO_VERSION: u32 = 1;
/// Bytes of the world info section: four u32 plus two f32.
const WORLD_INFO_SIZE: usize = 24;

/// What one [`TerrainWorld::tick`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub solid_cells_changed: usize,
    pub liquid_cells_changed: usize,
    pub liquid_steps: u32,
    pub solid_chunks_remeshed: usize,
    pub liquid_chunks_remeshed: usize,
    /// Solid chunks still waiting for a remesh.
    pub solid_backlog: usize,
    /// Liquid chunks still waiting for a remesh.
    pub liquid_backlog: usize,
}

/// Layered voxel terrain with one solid and one liquid density field.
///
/// Edits are queued and applied on [`tick`](TerrainWorld::tick), which
/// also runs the liquid solver at its fixed rate and remeshes dirty chunks
/// within the configured budget.
#[derive(Debug)]
pub struct TerrainWorld {
    config: TerrainConfig,
    dims: GridDims,
    solid: DensityField,
    liquid: DensityField,
    solid_edits: SolidEditQueue,
    liquid_solver: LiquidSolver,
    solid_dirty: DirtyTracker,
    liquid_dirty: DirtyTracker,
    solid_mesher: ChunkMesher,
    liquid_mesher: ChunkMesher,
    frame: u64,
}

impl TerrainWorld {
    /// Create an empty world. Both fields start at zero density.
    pub fn new(config: TerrainConfig) -> Result<Self> {
        config.validate()?;

        let dims = GridDims::from_config(&config);
        let (cell_size, cell_height) = (config.cell_size, config.cell_height);

        // Liquid dirty marking never reaches the layer below, so the liquid
        // mesher cannot rely on capped cells being refreshed.
        let liquid_mesher_config = MesherConfig {
            iso_level: config.liquid.iso_level,
            occlusion_checks: false,
            ..config.mesher.clone()
        };

        let world = Self {
            dims,
            solid: DensityField::with_dims(&dims),
            liquid: DensityField::with_dims(&dims),
            solid_edits: SolidEditQueue::new(dims, cell_size, cell_height),
            liquid_solver: LiquidSolver::new(dims, cell_size, cell_height, &config.liquid),
            solid_dirty: DirtyTracker::new(dims.chunk_dim),
            liquid_dirty: DirtyTracker::new(dims.chunk_dim),
            solid_mesher: ChunkMesher::new(dims, cell_size, cell_height, config.mesher.clone()),
            liquid_mesher: ChunkMesher::new(dims, cell_size, cell_height, liquid_mesher_config),
            frame: 0,
            config,
        };

        log::info!(
            "Created terrain world {}x{}x{} ({} chunks per field, chunk_dim {})",
            dims.width,
            dims.depth,
            dims.layers,
            dims.chunk_count(),
            dims.chunk_dim
        );
        Ok(world)
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Ticks run since creation.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    /// Queue an edit for the next tick.
    pub fn submit(&mut self, command: EditCommand) {
        match command {
            EditCommand::Solid { position, amount } => self.solid_edits.add_density(position, amount),
            EditCommand::Liquid { position, amount } => self.liquid_solver.add_density(position, amount),
        }
    }

    /// Queue a signed solid density change at a world position.
    pub fn add_solid_density(&mut self, position: Vec3, amount: f32) {
        self.submit(EditCommand::solid(position, amount));
    }

    /// Queue a signed liquid mass change at a world position.
    pub fn add_liquid_density(&mut self, position: Vec3, amount: f32) {
        self.submit(EditCommand::liquid(position, amount));
    }

    /// Replace the solid field with layer bands of an elevation map.
    ///
    /// Every solid chunk is queued for a remesh and the liquid solver is
    /// woken everywhere since the ground under it may have moved.
    pub fn apply_height_map(&mut self, heightmap: &HeightMap) -> Result<()> {
        self.solid_edits
            .apply_height_map(&mut self.solid, heightmap, &mut self.solid_dirty)?;
        self.liquid_solver.wake_all();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Frame update
    // -----------------------------------------------------------------------

    /// Advance the world by `dt` seconds.
    ///
    /// Solid edits are applied first, then queued liquid edits, then as many
    /// liquid sub-steps as the elapsed time allows. Chunks dirtied on the way
    /// are queued and remeshed within the budget.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        self.frame += 1;

        let solid_changed = self.solid_edits.update(&mut self.solid, &mut self.solid_dirty);
        for &cell in &solid_changed {
            self.liquid_solver.wake_cell(cell);
        }

        let liquid_cells_changed = self.liquid_solver.apply_edits(&mut self.liquid, &mut self.liquid_dirty);
        let liquid_steps = self
            .liquid_solver
            .update(dt, &mut self.liquid, &self.solid, &mut self.liquid_dirty);

        self.flush_dirty();
        let solid_chunks_remeshed = self.solid_mesher.remesh(&self.solid);
        let liquid_chunks_remeshed = self.liquid_mesher.remesh(&self.liquid);

        let report = TickReport {
            solid_cells_changed: solid_changed.len(),
            liquid_cells_changed,
            liquid_steps,
            solid_chunks_remeshed,
            liquid_chunks_remeshed,
            solid_backlog: self.solid_mesher.pending_count(),
            liquid_backlog: self.liquid_mesher.pending_count(),
        };
        if report.solid_backlog > 0 || report.liquid_backlog > 0 {
            log::debug!(
                "Frame {}: remesh backlog solid {} liquid {}",
                self.frame,
                report.solid_backlog,
                report.liquid_backlog
            );
        }
        report
    }

    /// Hand dirty chunks to the meshers and drain the dirty cell lists.
    fn flush_dirty(&mut self) {
        let solid_cells = self.solid_dirty.take_dirty_cells().len();
        let liquid_cells = self.liquid_dirty.take_dirty_cells().len();
        self.solid_mesher.enqueue_all(self.solid_dirty.take_dirty_chunks());
        self.liquid_mesher.enqueue_all(self.liquid_dirty.take_dirty_chunks());
        if solid_cells > 0 || liquid_cells > 0 {
            log::trace!(
                "Frame {}: {} solid and {} liquid dirty cells flushed",
                self.frame,
                solid_cells,
                liquid_cells
            );
        }
    }

    /// Remesh every chunk of both fields now, ignoring the budget.
    ///
    /// Returns the total triangle count.
    pub fn triangulate_all(&mut self) -> usize {
        self.solid_dirty.clear();
        self.liquid_dirty.clear();
        self.solid_mesher.triangulate_all(&self.solid) + self.liquid_mesher.triangulate_all(&self.liquid)
    }

    /// Run one liquid sub-step immediately, even with the simulation paused.
    ///
    /// Dirty chunks are queued for the next tick's remesh.
    pub fn step_liquid_once(&mut self, force: bool) -> SubStepReport {
        let report = self
            .liquid_solver
            .step_once(force, &mut self.liquid, &self.solid, &mut self.liquid_dirty);
        self.flush_dirty();
        report
    }

    pub fn set_simulation_enabled(&mut self, enabled: bool) {
        self.liquid_solver.set_simulation_enabled(enabled);
    }

    pub fn is_simulation_enabled(&self) -> bool {
        self.liquid_solver.is_enabled()
    }

    /// Toggle collision meshes on both meshers.
    pub fn set_collision_generation_enabled(&mut self, enabled: bool) {
        self.solid_mesher.set_collision_enabled(enabled);
        self.liquid_mesher.set_collision_enabled(enabled);
    }

    /// Toggle cap culling on the solid mesher.
    pub fn set_occlusion_checks_enabled(&mut self, enabled: bool) {
        self.solid_mesher.set_occlusion_checks_enabled(enabled);
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Serialize grid info and both density fields into one save buffer.
    pub fn save(&self) -> Result<Vec<u8>> {
        let capacity = SaveWriter::header_size(MAX_SECTIONS)
            + WORLD_INFO_SIZE
            + self.solid.encoded_len()
            + self.liquid.encoded_len();
        let mut writer = SaveWriter::new(capacity, MAX_SECTIONS)?;

        writer.begin_section(WORLD_INFO, WORLD_INFO_VERSION)?;
        writer.write_u32(self.dims.width)?;
        writer.write_u32(self.dims.depth)?;
        writer.write_u32(self.dims.layers)?;
        writer.write_u32(self.dims.chunk_dim)?;
        writer.write_f32(self.config.cell_size)?;
        writer.write_f32(self.config.cell_height)?;
        writer.end_section()?;

        self.solid.write_section(&mut writer, SOLID_DENSITY, DENSITY_VERSION)?;
        self.liquid.write_section(&mut writer, LIQUID_DENSITY, DENSITY_VERSION)?;

        let buffer = writer.finish()?;
        log::info!(
            "Saved world: {} bytes, liquid mass {:.3}",
            buffer.len(),
            self.liquid.total_mass()
        );
        Ok(buffer)
    }

    /// Restore density fields from a save buffer.
    ///
    /// Missing sections and sections whose grid extents do not match this
    /// world are skipped. Everything is retriangulated afterwards and the
    /// liquid solver is woken everywhere.
    pub fn load(&mut self, data: &[u8]) -> Result<()> {
        let reader = SaveReader::parse(data)?;

        if let Some(mut info) = reader.try_get_section(WORLD_INFO) {
            let saved = (info.read_u32()?, info.read_u32()?, info.read_u32()?);
            if saved != (self.dims.width, self.dims.depth, self.dims.layers) {
                log::warn!(
                    "Save was made for a {}x{}x{} grid, world is {}x{}x{}",
                    saved.0,
                    saved.1,
                    saved.2,
                    self.dims.width,
                    self.dims.depth,
                    self.dims.layers
                );
            }
        }

        let solid_loaded = load_field(&reader, SOLID_DENSITY, &mut self.solid)?;
        let liquid_loaded = load_field(&reader, LIQUID_DENSITY, &mut self.liquid)?;

        let triangles = self.triangulate_all();
        self.liquid_solver.wake_all();
        log::info!(
            "Loaded world (solid: {}, liquid: {}): {} triangles",
            solid_loaded,
            liquid_loaded,
            triangles
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Solid density at a cell, `None` outside the grid.
    pub fn solid_density_at(&self, cell: DensityCell) -> Option<f32> {
        self.solid.get(cell)
    }

    /// Liquid mass at a cell, `None` outside the grid.
    pub fn liquid_density_at(&self, cell: DensityCell) -> Option<f32> {
        self.liquid.get(cell)
    }

    pub fn solid_field(&self) -> &DensityField {
        &self.solid
    }

    pub fn liquid_field(&self) -> &DensityField {
        &self.liquid
    }

    pub fn total_liquid_mass(&self) -> f64 {
        self.liquid.total_mass()
    }

    /// Chunks per field.
    pub fn chunk_count(&self) -> usize {
        self.solid_mesher.chunk_count()
    }

    /// Chunks of both fields waiting for a remesh.
    pub fn pending_remesh_count(&self) -> usize {
        self.solid_mesher.pending_count() + self.liquid_mesher.pending_count()
    }

    pub fn solid_mesher(&self) -> &ChunkMesher {
        &self.solid_mesher
    }

    pub fn liquid_mesher(&self) -> &ChunkMesher {
        &self.liquid_mesher
    }

    pub fn liquid_solver(&self) -> &LiquidSolver {
        &self.liquid_solver
    }

    /// Queued edits of both materials not yet applied.
    pub fn pending_edit_count(&self) -> usize {
        self.solid_edits.pending_count() + self.liquid_solver.pending_count()
    }

    /// Chunks of one material remeshed since the last call.
    pub fn take_updated(&mut self, material: Material) -> Vec<ChunkCoord> {
        match material {
            Material::Solid => self.solid_mesher.take_updated(),
            Material::Liquid => self.liquid_mesher.take_updated(),
        }
    }
}

/// Read one density section into `field`. Returns whether it was applied.
fn load_field(
    reader: &SaveReader<'_>,
    id: SectionId,
    field: &mut DensityField,
) -> Result<bool> {
    let name = section_name(id).unwrap_or("unknown");
    let Some(mut section) = reader.try_get_section(id) else {
        log::debug!("Save has no {} section, keeping current field", name);
        return Ok(false);
    };
    match field.read_section(&mut section) {
        Ok(()) => Ok(true),
        Err(PersistError::LayoutMismatch(reason)) => {
            log::warn!("Skipping {} section: {}", name, reason);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
