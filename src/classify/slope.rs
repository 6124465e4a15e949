use glam::UVec2;

use super::NeighborhoodClassifier;
use crate::grid::Grid2d;
use crate::types::UNKNOWN;

/// Slope angle (radians) of every cell; unknown where the elevation is unknown.
pub fn slope_angles(elevation: &Grid2d<f64>) -> Grid2d<f64> {
    Grid2d::par_from_fn(elevation.info().clone(), |cell| {
        elevation.slope_angle(cell).unwrap_or(UNKNOWN)
    })
}

impl NeighborhoodClassifier {
    /// `false` if `cell` is steep and enough of its window is steep as well.
    ///
    /// `slopes` is the output of [`slope_angles`] for the elevation layer.
    pub fn check_for_slope(&self, slopes: &Grid2d<f64>, cell: UVec2) -> bool {
        let steep = |c: UVec2| slopes.known(c).is_some_and(|s| s > self.slope_threshold);
        if !steep(cell) {
            return true;
        }
        let info = slopes.info();
        let count = 1 + self
            .slope_window
            .iter()
            .filter_map(|&d| info.offset_cell(cell, d))
            .filter(|&c| steep(c))
            .count();
        count <= self.slope_cell_limit
    }
}
