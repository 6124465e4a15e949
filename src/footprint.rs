//! Whole-raster footprint precomputation.
//!
//! Each cell of `footprint_fixed` holds the footprint score with the robot at
//! the cell center and a fixed heading; each cell of `footprint_oriented` holds
//! the score of an annulus around the cell center, which does not depend on
//! the heading. Cells whose query fails stay unknown.

use std::time::Instant;

use crate::config::TraversabilityConfig;
use crate::evaluate::Evaluator;
use crate::grid::Grid2d;
use crate::raster::{AnnulusParams, FootprintMode, TraversabilityRaster};
use crate::types::{Pose2, TraversabilityError, UNKNOWN};

/// Footprint score at every cell center with heading `yaw`.
pub fn footprint_layer(
    raster: &TraversabilityRaster,
    config: &TraversabilityConfig,
    yaw: f64,
) -> Result<Grid2d<f64>, TraversabilityError> {
    let evaluator = Evaluator::new(raster, config)?;
    let info = raster.map.info();
    Ok(Grid2d::par_from_fn(info.clone(), |cell| {
        evaluator
            .is_traversable_footprint(Pose2::new(info.cell_center(cell), yaw))
            .map_or(UNKNOWN, |r| r.score)
    }))
}

/// Annulus score at every cell center, outer radius `radius`, inner radius `offset`.
pub fn annulus_layer(
    raster: &TraversabilityRaster,
    config: &TraversabilityConfig,
    radius: f64,
    offset: f64,
) -> Result<Grid2d<f64>, TraversabilityError> {
    let evaluator = Evaluator::new(raster, config)?;
    let info = raster.map.info();
    Ok(Grid2d::par_from_fn(info.clone(), |cell| {
        evaluator
            .is_traversable_circle(info.cell_center(cell), radius, offset)
            .map_or(UNKNOWN, |r| r.score)
    }))
}

impl TraversabilityRaster {
    /// Fill `footprint_fixed` for heading `yaw`.
    pub fn traversability_footprint(
        &mut self,
        config: &TraversabilityConfig,
        yaw: f64,
    ) -> Result<(), TraversabilityError> {
        let start = Instant::now();
        let layer = footprint_layer(self, config, yaw)?;
        self.map
            .insert_layer(FootprintMode::FixedHeading(yaw).layer(), layer)?;
        self.fixed_heading = Some(yaw);
        log::debug!("footprint layer at yaw {yaw:.3} took {:?}", start.elapsed());
        Ok(())
    }

    /// Fill `footprint_oriented` with the annulus `[offset, radius]`.
    pub fn traversability_footprint_radius(
        &mut self,
        config: &TraversabilityConfig,
        radius: f64,
        offset: f64,
    ) -> Result<(), TraversabilityError> {
        if !(offset >= 0.0 && radius >= offset && radius.is_finite()) {
            return Err(TraversabilityError::Geometry(format!(
                "invalid annulus [{offset}, {radius}]"
            )));
        }
        let start = Instant::now();
        let layer = annulus_layer(self, config, radius, offset)?;
        self.map
            .insert_layer(FootprintMode::OrientedByPath.layer(), layer)?;
        self.oriented = Some(AnnulusParams { radius, offset });
        log::debug!(
            "annulus layer [{offset:.3}, {radius:.3}] took {:?}",
            start.elapsed()
        );
        Ok(())
    }
}
