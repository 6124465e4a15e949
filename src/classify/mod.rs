//! Per-cell hazard checks on the elevation layer.
//!
//! [`NeighborhoodClassifier`] looks at a disk of cells around the queried one:
//! `check_for_step` flags height discontinuities that are wider than the
//! crossable gap, `check_for_slope` flags steep patches that are large enough
//! to matter. Both return `true` when the cell passes.

mod slope;
mod step;

pub use slope::slope_angles;

use glam::{IVec2, UVec2};
use rayon::prelude::*;

use crate::config::TraversabilityConfig;
use crate::grid::Grid2d;

/// Window radius for step detection when none is configured, in cells.
pub const DEFAULT_STEP_WINDOW_CELLS: f64 = 1.5;
/// Window radius for slope persistence when none is configured, in cells.
pub const DEFAULT_SLOPE_WINDOW_CELLS: f64 = 3.0;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct NeighborhoodClassifier {
    step_height_threshold: f64,
    /// Longest walk from an anchor, in cells.
    max_gap_cells: f64,
    step_window: Vec<IVec2>,
    slope_threshold: f64,
    slope_window: Vec<IVec2>,
    /// Steep cells needed inside the slope window, exclusive.
    slope_cell_limit: usize,
}

impl NeighborhoodClassifier {
    pub fn new(config: &TraversabilityConfig, resolution: f64) -> Self {
        let step_radius = config
            .step_window_radius
            .unwrap_or(DEFAULT_STEP_WINDOW_CELLS * resolution);
        let slope_radius = config
            .slope_window_radius
            .unwrap_or(DEFAULT_SLOPE_WINDOW_CELLS * resolution);
        let slope_cell_limit =
            (2.0 * slope_radius * config.slope_critical_length / (resolution * resolution) + EPSILON)
                .floor()
                .max(0.0) as usize;

        Self {
            step_height_threshold: config.step_height_threshold,
            max_gap_cells: config.max_gap_width / resolution,
            step_window: disk_offsets(step_radius / resolution),
            slope_threshold: config.slope_threshold,
            slope_window: disk_offsets(slope_radius / resolution),
            slope_cell_limit,
        }
    }

    pub fn slope_cell_limit(&self) -> usize {
        self.slope_cell_limit
    }

    /// Cells failing either check, in storage order.
    pub fn hazards(&self, elevation: &Grid2d<f64>) -> Vec<bool> {
        let slopes = slope_angles(elevation);
        (0..elevation.info().len())
            .into_par_iter()
            .map(|i| {
                let cell = elevation.cell(i);
                !self.check_for_step(elevation, cell) || !self.check_for_slope(&slopes, cell)
            })
            .collect()
    }
}

/// Non-zero offsets whose length is within `radius` cells.
fn disk_offsets(radius: f64) -> Vec<IVec2> {
    let r = radius.max(0.0);
    let reach = (r + EPSILON).floor() as i32;
    let limit = r * r + EPSILON;
    let mut offsets = Vec::new();
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let d = IVec2::new(dx, dy);
            if d != IVec2::ZERO && (d.length_squared() as f64) <= limit {
                offsets.push(d);
            }
        }
    }
    offsets
}

fn cell_offset(from: UVec2, to: UVec2) -> IVec2 {
    to.as_ivec2() - from.as_ivec2()
}
