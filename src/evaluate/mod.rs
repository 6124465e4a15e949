//! Geometry queries against a traversability raster.
//!
//! Every query aggregates the resolved traversability of the cells it covers as
//! an arithmetic mean and compares it with the configured threshold. Unknown
//! cells resolve to `default_traversability`, or fail the query in strict mode.

mod path;

use glam::{DVec2, UVec2};

use crate::config::TraversabilityConfig;
use crate::grid::Grid2d;
use crate::iterators::{AnnulusIterator, LineSampler, PolygonIterator};
use crate::raster::TraversabilityRaster;
use crate::types::{
    Footprint, LAYER_ELEVATION, Polygon, PolygonResult, Pose2, TraversabilityError,
};

pub struct Evaluator<'a> {
    raster: &'a TraversabilityRaster,
    traversability: &'a Grid2d<f64>,
    elevation: Option<&'a Grid2d<f64>>,
    config: &'a TraversabilityConfig,
    footprint: Footprint,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        raster: &'a TraversabilityRaster,
        config: &'a TraversabilityConfig,
    ) -> Result<Self, TraversabilityError> {
        Ok(Self {
            traversability: raster.traversability()?,
            elevation: raster.map.layer(LAYER_ELEVATION).ok(),
            raster,
            config,
            footprint: config.footprint(),
        })
    }

    /// Read heights for inclination checks from `elevation` instead of the raster.
    pub fn with_elevation(mut self, elevation: &'a Grid2d<f64>) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn raster(&self) -> &TraversabilityRaster {
        self.raster
    }

    fn verdict(&self, score: f64) -> PolygonResult {
        PolygonResult {
            traversable: score >= self.config.traversability_threshold,
            score,
        }
    }

    /// Traversability at `cell` with unknown replaced by the default.
    fn resolve(&self, cell: UVec2) -> Result<f64, TraversabilityError> {
        match self.traversability.known(cell) {
            Some(value) => Ok(value),
            None if self.config.strict_unknown => Err(TraversabilityError::Geometry(format!(
                "cell ({}, {}) has unknown traversability",
                cell.x, cell.y
            ))),
            None => Ok(self.config.default_traversability),
        }
    }

    /// Mean resolved traversability, `None` if `cells` is empty.
    fn mean(&self, cells: impl Iterator<Item = UVec2>) -> Result<Option<f64>, TraversabilityError> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for cell in cells {
            sum += self.resolve(cell)?;
            count += 1;
        }
        Ok((count > 0).then(|| sum / count as f64))
    }

    fn point(&self, position: DVec2) -> Result<PolygonResult, TraversabilityError> {
        let cell = self.traversability.info().world_to_cell(position).ok_or_else(|| {
            TraversabilityError::Geometry(format!(
                "({:.3}, {:.3}) is outside the map",
                position.x, position.y
            ))
        })?;
        Ok(self.verdict(self.resolve(cell)?))
    }

    /// Mean over the cells whose centers lie inside `polygon`.
    ///
    /// A polygon too small to cover any cell center is evaluated at the cell
    /// containing its centroid.
    pub fn is_traversable_polygon(&self, polygon: &Polygon) -> Result<PolygonResult, TraversabilityError> {
        let centroid = polygon
            .centroid()
            .ok_or_else(|| TraversabilityError::Geometry("polygon has no vertices".to_string()))?;
        if !centroid.is_finite() {
            return Err(TraversabilityError::Geometry(
                "polygon has non-finite vertices".to_string(),
            ));
        }

        let info = self.traversability.info();
        let score = match PolygonIterator::new(info, polygon) {
            Some(cells) => self.mean(cells)?,
            None => None,
        };
        match score {
            Some(score) => Ok(self.verdict(score)),
            None => self.point(centroid),
        }
    }

    /// Mean over the cells whose center distance is in `[radius_min, radius_max]`.
    pub fn is_traversable_circle(
        &self,
        center: DVec2,
        radius_max: f64,
        radius_min: f64,
    ) -> Result<PolygonResult, TraversabilityError> {
        if !(center.is_finite() && radius_min >= 0.0 && radius_max >= radius_min) {
            return Err(TraversabilityError::Geometry(format!(
                "invalid annulus [{radius_min}, {radius_max}]"
            )));
        }
        let cells = AnnulusIterator::new(self.traversability.info(), center, radius_max, radius_min);
        match self.mean(cells)? {
            Some(score) => Ok(self.verdict(score)),
            None if radius_min == 0.0 => self.point(center),
            None => Err(TraversabilityError::Geometry(format!(
                "annulus [{radius_min}, {radius_max}] covers no cells"
            ))),
        }
    }

    /// Footprint polygon placed at `pose`.
    pub fn is_traversable_footprint(&self, pose: Pose2) -> Result<PolygonResult, TraversabilityError> {
        self.is_traversable_polygon(&self.footprint.transform(pose))
    }

    /// `false` if the terrain between `start` and `end` is steeper than `max_incline_angle`.
    ///
    /// Samples without known elevation on both sides are skipped. Without any
    /// elevation layer the check fails with `UninitializedInput`.
    pub fn check_inclination(&self, start: DVec2, end: DVec2) -> Result<bool, TraversabilityError> {
        let elevation = self.elevation.ok_or_else(|| {
            TraversabilityError::UninitializedInput(
                "no elevation layer for inclination check".to_string(),
            )
        })?;
        if start == end {
            return Ok(true);
        }
        let info = elevation.info();
        let spacing = self
            .config
            .inclination_sample_spacing
            .filter(|s| *s > 0.0)
            .unwrap_or(info.resolution);
        let sampler = LineSampler::new(start, end, spacing);
        let direction = sampler.direction();
        let reach = direction * sampler.step_length();

        for sample in sampler {
            let Some(behind) = info.world_to_cell(sample.position - reach) else {
                continue;
            };
            let Some(ahead) = info.world_to_cell(sample.position + reach) else {
                continue;
            };
            let (Some(h_behind), Some(h_ahead)) = (elevation.known(behind), elevation.known(ahead))
            else {
                continue;
            };
            let run = (info.cell_center(ahead) - info.cell_center(behind)).dot(direction);
            if run < 0.5 * info.resolution {
                continue;
            }
            let incline = ((h_ahead - h_behind) / run).abs().atan();
            if incline > self.config.max_incline_angle {
                log::debug!(
                    "incline {incline:.3} rad at ({:.3}, {:.3})",
                    sample.position.x,
                    sample.position.y
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::grid::RasterMap;
    use crate::types::{
        LAYER_ROUGHNESS, LAYER_SLOPE, LAYER_STEP, LAYER_TRAVERSABILITY, MapInfo, UNKNOWN,
    };

    pub(super) fn raster(size: u32, resolution: f64, value: f64) -> TraversabilityRaster {
        let mut map = RasterMap::new(MapInfo::square(size, resolution));
        map.add_layer(LAYER_TRAVERSABILITY, value);
        for layer in [LAYER_STEP, LAYER_SLOPE, LAYER_ROUGHNESS, LAYER_ELEVATION] {
            map.add_layer(layer, 0.0);
        }
        TraversabilityRaster::new(map, 0.5).unwrap()
    }

    pub(super) fn set(raster: &mut TraversabilityRaster, layer: &str, cell: (u32, u32), value: f64) {
        raster
            .map
            .layer_mut(layer)
            .unwrap()
            .set(UVec2::new(cell.0, cell.1), value)
            .unwrap();
    }

    fn square(center: DVec2, half: f64) -> Polygon {
        Polygon::new(vec![
            center + DVec2::new(-half, -half),
            center + DVec2::new(half, -half),
            center + DVec2::new(half, half),
            center + DVec2::new(-half, half),
        ])
    }

    #[test]
    fn polygon_mean_over_covered_cells() {
        let mut raster = raster(4, 1.0, 1.0);
        set(&mut raster, LAYER_TRAVERSABILITY, (1, 1), 0.0);
        let config = TraversabilityConfig::default();
        let eval = Evaluator::new(&raster, &config).unwrap();
        // covers (1,1), (2,1), (1,2), (2,2)
        let result = eval.is_traversable_polygon(&square(DVec2::splat(2.0), 1.0)).unwrap();
        assert_relative_eq!(result.score, 0.75);
        assert!(result.traversable);
    }

    #[test]
    fn degenerate_polygon_equals_point_query() {
        let mut raster = raster(4, 1.0, 1.0);
        set(&mut raster, LAYER_TRAVERSABILITY, (2, 1), 0.2);
        let config = TraversabilityConfig::default();
        let eval = Evaluator::new(&raster, &config).unwrap();
        let p = DVec2::new(2.3, 1.6);
        let point = Polygon::new(vec![p, p, p]);
        let result = eval.is_traversable_polygon(&point).unwrap();
        assert_relative_eq!(result.score, 0.2);
        assert!(!result.traversable);

        let outside = Polygon::new(vec![DVec2::splat(-3.0); 3]);
        assert!(matches!(
            eval.is_traversable_polygon(&outside),
            Err(TraversabilityError::Geometry(_))
        ));
        assert!(eval.is_traversable_polygon(&Polygon::default()).is_err());
    }

    #[test]
    fn unknown_cells_use_default_or_fail_in_strict_mode() {
        let mut raster = raster(4, 1.0, 1.0);
        set(&mut raster, LAYER_TRAVERSABILITY, (1, 1), UNKNOWN);
        let poly = square(DVec2::splat(2.0), 1.0);

        let config = TraversabilityConfig {
            default_traversability: 0.2,
            ..Default::default()
        };
        let result = Evaluator::new(&raster, &config)
            .unwrap()
            .is_traversable_polygon(&poly)
            .unwrap();
        assert_relative_eq!(result.score, 0.8);

        let strict = TraversabilityConfig {
            strict_unknown: true,
            ..config
        };
        assert!(matches!(
            Evaluator::new(&raster, &strict).unwrap().is_traversable_polygon(&poly),
            Err(TraversabilityError::Geometry(_))
        ));
    }

    #[test]
    fn circle_and_annulus() {
        let mut raster = raster(9, 1.0, 1.0);
        set(&mut raster, LAYER_TRAVERSABILITY, (4, 4), 0.0);
        let config = TraversabilityConfig::default();
        let eval = Evaluator::new(&raster, &config).unwrap();
        let center = DVec2::splat(4.5);

        let disk = eval.is_traversable_circle(center, 1.0, 0.0).unwrap();
        assert_relative_eq!(disk.score, 0.8);
        let ring = eval.is_traversable_circle(center, 1.0, 0.5).unwrap();
        assert_relative_eq!(ring.score, 1.0);
        let tiny = eval.is_traversable_circle(center, 0.0, 0.0).unwrap();
        assert_relative_eq!(tiny.score, 0.0);

        assert!(eval.is_traversable_circle(DVec2::new(4.0, 4.0), 0.2, 0.1).is_err());
        assert!(eval.is_traversable_circle(center, 0.5, 1.0).is_err());
    }

    #[test]
    fn inclination_on_flat_and_ramp() {
        let mut raster = raster(20, 0.1, 1.0);
        let config = TraversabilityConfig::default();
        let a = DVec2::new(0.25, 1.0);
        let b = DVec2::new(1.75, 1.0);
        {
            let eval = Evaluator::new(&raster, &config).unwrap();
            assert!(eval.check_inclination(a, b).unwrap());
            assert!(eval.check_inclination(a, a).unwrap());
        }

        // rise of 1 m per m along x, 45 degrees > 0.5 rad
        let ramp = Grid2d::par_from_fn(raster.map.info().clone(), |c| c.x as f64 * 0.1);
        raster.map.insert_layer(LAYER_ELEVATION, ramp).unwrap();
        let eval = Evaluator::new(&raster, &config).unwrap();
        assert!(!eval.check_inclination(a, b).unwrap());
        // across the ramp the terrain is level
        assert!(eval.check_inclination(DVec2::new(1.0, 0.25), DVec2::new(1.0, 1.75)).unwrap());
    }

    #[test]
    fn inclination_needs_an_elevation_layer() {
        let mut raster = raster(20, 0.1, 1.0);
        let ramp = Grid2d::par_from_fn(raster.map.info().clone(), |c| c.x as f64 * 0.1);
        raster.map.remove_layer(LAYER_ELEVATION);
        let config = TraversabilityConfig::default();
        let a = DVec2::new(0.25, 1.0);
        let b = DVec2::new(1.75, 1.0);

        let eval = Evaluator::new(&raster, &config).unwrap();
        assert!(matches!(
            eval.check_inclination(a, b),
            Err(TraversabilityError::UninitializedInput(_))
        ));
        assert!(!eval.with_elevation(&ramp).check_inclination(a, b).unwrap());
    }
}
