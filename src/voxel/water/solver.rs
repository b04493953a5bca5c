//! Liquid cellular automaton.
//!
//! Liquid mass lives in a [`DensityField`] next to the solid field. Each
//! fixed sub-step visits the cells marked dirty by the previous one, moves
//! mass down first and then sideways, and records every move in a per-layer
//! delta buffer so the result does not depend on visiting order. Deltas are
//! committed at the end of the sub-step.

use crate::core::config::LiquidConfig;
use crate::core::time::FixedTimestep;
use crate::core::types::Vec3;
use crate::math::CellRect;
use crate::voxel::cell::{DensityCell, GridDims};
use crate::voxel::density::DensityField;
use crate::voxel::dirty::DirtyTracker;

/// Horizontal neighbours in flow priority order: left, right, back, forward.
const HORIZONTAL: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Mass the lower of two stacked cells holds when `total` is shared between
/// them. Above `max_value` the lower cell is compressed slightly so that
/// pressure pushes liquid sideways.
pub fn stable_level(total: f32, max_value: f32, max_compression: f32) -> f32 {
    if total <= max_value {
        max_value
    } else if total < 2.0 * max_value + max_compression {
        (max_value * max_value + total * max_compression) / (max_value + max_compression)
    } else {
        (total + max_compression) / 2.0
    }
}

/// What one sub-step did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SubStepReport {
    /// Mass moved between cells.
    pub moved: f32,
    /// Mass swallowed by the water plane.
    pub absorbed: f32,
    /// Mass removed from cells holding less than the evaporation epsilon.
    pub evaporated: f32,
    /// Distinct cells whose mass changed.
    pub touched: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct PendingLiquid {
    cell: DensityCell,
    amount: f32,
}

/// Fixed-rate liquid flow over the liquid density field.
#[derive(Debug)]
pub struct LiquidSolver {
    dims: GridDims,
    cell_size: f32,
    cell_height: f32,
    config: LiquidConfig,
    enabled: bool,
    timestep: FixedTimestep,
    /// Pending mass changes of the running sub-step, one buffer per layer
    delta: Vec<Vec<f32>>,
    /// Cells to visit on the next sub-step, one rectangle per layer
    dirty_rects: Vec<Option<CellRect>>,
    pending: Vec<PendingLiquid>,
    last_report: SubStepReport,
}

impl LiquidSolver {
    pub fn new(dims: GridDims, cell_size: f32, cell_height: f32, config: &LiquidConfig) -> Self {
        Self {
            dims,
            cell_size,
            cell_height,
            enabled: config.enabled,
            timestep: FixedTimestep::from_rate(config.tick_rate),
            delta: (0..dims.layers).map(|_| vec![0.0; dims.layer_len()]).collect(),
            dirty_rects: vec![None; dims.layers as usize],
            pending: Vec::new(),
            last_report: SubStepReport::default(),
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &LiquidConfig {
        &self.config
    }

    /// Pause or resume time-driven sub-steps. Paused time is discarded.
    pub fn set_simulation_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::debug!("Liquid simulation {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
        self.timestep.reset();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn last_report(&self) -> SubStepReport {
        self.last_report
    }

    /// Sub-steps run since creation.
    pub fn total_steps(&self) -> u64 {
        self.timestep.total_steps()
    }

    /// Cells every layer may flow from.
    fn interior(&self) -> CellRect {
        CellRect::new(1, 1, self.dims.width as i32 - 2, self.dims.depth as i32 - 2)
    }

    /// Whether any layer has cells queued for the next sub-step.
    pub fn has_active_cells(&self) -> bool {
        self.dirty_rects.iter().any(Option::is_some)
    }

    /// Dirty rectangle queued for a layer.
    pub fn dirty_rect(&self, layer: usize) -> Option<CellRect> {
        self.dirty_rects.get(layer).copied().flatten()
    }

    /// Queue a signed mass change at the cell containing `position`.
    pub fn add_density(&mut self, position: Vec3, amount: f32) {
        if !amount.is_finite() {
            log::trace!("Dropping liquid edit at {:?}: amount {} is not finite", position, amount);
            return;
        }
        let cell = DensityCell::from_world(position, self.cell_size, self.cell_height);
        if !cell.in_bounds(&self.dims) {
            log::trace!("Dropping liquid edit at {:?}: cell {:?} outside the grid", position, cell);
            return;
        }
        self.pending.push(PendingLiquid { cell, amount });
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Apply queued edits to single cells and wake the solver around them.
    ///
    /// Returns the number of cells that changed.
    pub fn apply_edits(&mut self, liquid: &mut DensityField, dirty: &mut DirtyTracker) -> usize {
        let limit = self.config.mass_limit();
        let mut changed = 0;
        for edit in std::mem::take(&mut self.pending) {
            let cell = edit.cell;
            let applied = liquid.add(cell, edit.amount, limit).filter(|&d| d != 0.0);
            if applied.is_some() {
                dirty.mark_cell_stencil(cell);
                self.wake_cell(cell);
                changed += 1;
            }
        }
        changed
    }

    /// Queue a cell, its neighbours and the cells above for the next sub-step.
    pub fn wake_cell(&mut self, cell: DensityCell) {
        let rect = CellRect::point(cell.x, cell.z).inflate(1);
        self.wake_rect(cell.layer, rect);
        self.wake_rect(cell.layer + 1, rect);
    }

    /// Queue every interior cell on every layer.
    pub fn wake_all(&mut self) {
        let interior = self.interior();
        for layer in 0..self.dims.layers as i32 {
            self.wake_rect(layer, interior);
        }
    }

    fn wake_rect(&mut self, layer: i32, rect: CellRect) {
        if layer < 0 || layer as u32 >= self.dims.layers {
            return;
        }
        let Some(rect) = rect.clamp_to(&self.interior()) else {
            return;
        };
        let slot = &mut self.dirty_rects[layer as usize];
        *slot = Some(match *slot {
            Some(existing) => existing.union(&rect),
            None => rect,
        });
    }

    /// Advance by `dt` seconds, running one sub-step per elapsed interval.
    ///
    /// Returns the number of sub-steps run.
    pub fn update(
        &mut self,
        dt: f32,
        liquid: &mut DensityField,
        solid: &DensityField,
        dirty: &mut DirtyTracker,
    ) -> u32 {
        if !self.enabled {
            return 0;
        }
        let steps = self.timestep.advance(dt);
        for _ in 0..steps {
            self.sub_step(liquid, solid, dirty, false);
        }
        if steps > 0 {
            log::debug!(
                "Liquid ran {} sub-steps, last moved {:.4} over {} cells",
                steps,
                self.last_report.moved,
                self.last_report.touched
            );
        }
        steps
    }

    /// Run exactly one sub-step now, ignoring the timer and the enabled flag.
    ///
    /// With `force` every interior cell is visited instead of the dirty ones.
    pub fn step_once(
        &mut self,
        force: bool,
        liquid: &mut DensityField,
        solid: &DensityField,
        dirty: &mut DirtyTracker,
    ) -> SubStepReport {
        self.sub_step(liquid, solid, dirty, force)
    }

    fn sub_step(
        &mut self,
        liquid: &mut DensityField,
        solid: &DensityField,
        dirty: &mut DirtyTracker,
        force: bool,
    ) -> SubStepReport {
        if force {
            self.wake_all();
        }
        let rects = std::mem::replace(&mut self.dirty_rects, vec![None; self.dims.layers as usize]);

        let mut step = StepState {
            touched_rects: vec![None; self.dims.layers as usize],
            touched: Vec::new(),
            report: SubStepReport::default(),
        };

        let layer_count = self.dims.layers as usize;
        for layer in 1..layer_count.saturating_sub(1) {
            if self.config.water_plane_layer == Some(layer as u32) {
                continue;
            }
            let Some(rect) = rects[layer] else {
                continue;
            };
            for (x, z) in rect.cells() {
                self.flow_cell(liquid, solid, &mut step, layer, x, z);
            }
        }

        // Commit.
        for (layer, rect) in step.touched_rects.iter().enumerate() {
            let Some(rect) = rect else {
                continue;
            };
            let width = self.dims.width as usize;
            let values = liquid.layer_mut(layer);
            let deltas = &mut self.delta[layer];
            for (x, z) in rect.cells() {
                let idx = z as usize * width + x as usize;
                if deltas[idx] != 0.0 {
                    values[idx] = (values[idx] + deltas[idx]).max(0.0);
                    deltas[idx] = 0.0;
                }
            }
        }

        step.touched.sort_unstable();
        step.touched.dedup();
        step.report.touched = step.touched.len();
        for &cell in &step.touched {
            dirty.mark_cell_stencil(cell);
        }

        for (layer, rect) in step.touched_rects.iter().enumerate() {
            if let Some(rect) = rect {
                let grown = rect.inflate(1);
                self.wake_rect(layer as i32, grown);
                self.wake_rect(layer as i32 + 1, grown);
            }
        }

        self.last_report = step.report;
        step.report
    }

    fn is_blocked(&self, solid: &DensityField, layer: usize, x: i32, z: i32) -> bool {
        solid.sample(layer, x as u32, z as u32) > self.config.solid_iso_level
    }

    fn projected(&self, liquid: &DensityField, layer: usize, idx: usize) -> f32 {
        liquid.layer(layer)[idx] + self.delta[layer][idx]
    }

    fn flow_cell(
        &mut self,
        liquid: &DensityField,
        solid: &DensityField,
        step: &mut StepState,
        layer: usize,
        x: i32,
        z: i32,
    ) {
        let width = self.dims.width as i32;
        let idx = (z * width + x) as usize;
        let mass = liquid.layer(layer)[idx];
        if mass <= 0.0 || self.is_blocked(solid, layer, x, z) {
            return;
        }

        let cfg = &self.config;
        let (max_value, compression, epsilon) = (cfg.max_value, cfg.max_compression, cfg.evaporation_epsilon);
        let (max_flow, flow_multiplier, limit) = (cfg.max_flow, cfg.flow_multiplier, cfg.mass_limit());
        let plane = cfg.water_plane_layer.map(|p| p as usize);

        if mass < epsilon {
            self.delta[layer][idx] -= mass;
            step.report.evaporated += mass;
            step.touch(layer, x, z);
            return;
        }

        let mut remaining = mass;

        let below = layer - 1;
        if !self.is_blocked(solid, below, x, z) {
            if plane == Some(below) {
                let room = (max_value - liquid.layer(below)[idx]).max(0.0);
                let amount = remaining.min(room);
                if amount >= epsilon {
                    self.delta[layer][idx] -= amount;
                    remaining -= amount;
                    step.report.absorbed += amount;
                    step.touch(layer, x, z);
                }
            } else {
                let amount = remaining.min(max_value - self.projected(liquid, below, idx)).max(0.0);
                if amount >= epsilon {
                    self.delta[layer][idx] -= amount;
                    self.delta[below][idx] += amount;
                    remaining -= amount;
                    step.report.moved += amount;
                    step.touch(layer, x, z);
                    step.touch(below, x, z);
                }
            }
        }

        for (dx, dz) in HORIZONTAL {
            if remaining <= 0.0 {
                break;
            }
            let (nx, nz) = (x + dx, z + dz);
            if nx < 0 || nz < 0 || nx >= width || nz >= self.dims.depth as i32 {
                continue;
            }
            if self.is_blocked(solid, layer, nx, nz) {
                continue;
            }
            let nidx = (nz * width + nx) as usize;
            let neighbour = self.projected(liquid, layer, nidx);
            let amount = ((remaining - neighbour) * 0.5 * flow_multiplier)
                .min(max_flow)
                .min(remaining)
                .min(stable_level(remaining + neighbour, max_value, compression) - neighbour)
                .min(limit - neighbour)
                .max(0.0);
            if amount < epsilon {
                continue;
            }
            self.delta[layer][idx] -= amount;
            self.delta[layer][nidx] += amount;
            remaining -= amount;
            step.report.moved += amount;
            step.touch(layer, x, z);
            step.touch(layer, nx, nz);
        }
    }
}

struct StepState {
    touched_rects: Vec<Option<CellRect>>,
    touched: Vec<DensityCell>,
    report: SubStepReport,
}

impl StepState {
    fn touch(&mut self, layer: usize, x: i32, z: i32) {
        self.touched.push(DensityCell::new(x, z, layer as i32));
        match &mut self.touched_rects[layer] {
            Some(rect) => rect.include(x, z),
            slot @ None => *slot = Some(CellRect::point(x, z)),
        }
    }
}
