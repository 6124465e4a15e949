use std::f64::consts::{PI, TAU};

use glam::DVec2;

use super::Evaluator;
use crate::raster::{AnnulusParams, FootprintMode};
use crate::types::{
    FootprintPath, HeadingMode, PolygonResult, Pose2, TraversabilityError, TraversabilityResult,
};

const ANGLE_EPSILON: f64 = 1e-9;
const LENGTH_EPSILON: f64 = 1e-9;

fn same_angle(a: f64, b: f64) -> bool {
    ((a - b + PI).rem_euclid(TAU) - PI).abs() < ANGLE_EPSILON
}

fn same_annulus(stored: Option<AnnulusParams>, radius: f64, offset: f64) -> bool {
    stored.is_some_and(|a| {
        (a.radius - radius).abs() < LENGTH_EPSILON && (a.offset - offset).abs() < LENGTH_EPSILON
    })
}

/// Heading from waypoint `i` toward the next one, or from the previous one at the end.
fn travel_heading(positions: &[DVec2], i: usize) -> f64 {
    let forward = positions.get(i + 1).map(|next| *next - positions[i]);
    let backward = i
        .checked_sub(1)
        .and_then(|prev| positions.get(prev))
        .map(|prev| positions[i] - *prev);
    forward
        .filter(|d| *d != DVec2::ZERO)
        .or(backward.filter(|d| *d != DVec2::ZERO))
        .map_or(0.0, DVec2::to_angle)
}

impl Evaluator<'_> {
    /// Check every waypoint of `path` and the inclination between consecutive ones.
    ///
    /// Precomputed footprint layers answer a waypoint when they were built for
    /// the same heading or radius; the value is the one stored for the cell
    /// containing the waypoint.
    pub fn check_footprint_path(
        &self,
        path: &FootprintPath,
    ) -> Result<TraversabilityResult, TraversabilityError> {
        if path.waypoints.is_empty() {
            return Err(TraversabilityError::Geometry("path has no waypoints".to_string()));
        }
        let positions: Vec<DVec2> = path.waypoints.iter().map(|w| w.position).collect();

        let mut traversable = true;
        let mut per_waypoint_scores = Vec::with_capacity(positions.len());
        for i in 0..positions.len() {
            let result = self.check_waypoint(path, &positions, i)?;
            traversable &= result.traversable;
            per_waypoint_scores.push(result.score);
        }

        for (i, pair) in positions.windows(2).enumerate() {
            if !self.check_inclination(pair[0], pair[1])? {
                log::debug!("segment {i} of path exceeds the incline limit");
                traversable = false;
            }
        }

        let score = per_waypoint_scores.iter().sum::<f64>() / per_waypoint_scores.len() as f64;
        Ok(TraversabilityResult {
            traversable,
            score,
            per_waypoint_scores,
        })
    }

    fn check_waypoint(
        &self,
        path: &FootprintPath,
        positions: &[DVec2],
        i: usize,
    ) -> Result<PolygonResult, TraversabilityError> {
        let waypoint = &path.waypoints[i];
        let raster = self.raster();

        if let Some(radius) = waypoint.radius {
            if same_annulus(raster.oriented, radius, 0.0)
                && let Some(score) =
                    raster.cached_footprint(FootprintMode::OrientedByPath, waypoint.position)
            {
                return Ok(self.verdict(score));
            }
            return self.is_traversable_circle(waypoint.position, radius, 0.0);
        }

        let yaw = match (path.heading, waypoint.yaw) {
            (HeadingMode::FixedHeading(fixed), yaw) => {
                let yaw = yaw.unwrap_or(fixed);
                if raster.fixed_heading.is_some_and(|h| same_angle(h, yaw))
                    && let Some(score) =
                        raster.cached_footprint(FootprintMode::FixedHeading(yaw), waypoint.position)
                {
                    return Ok(self.verdict(score));
                }
                yaw
            }
            (HeadingMode::OrientedByPath, Some(yaw)) => yaw,
            (HeadingMode::OrientedByPath, None) => {
                if same_annulus(raster.oriented, self.config.footprint_precompute_radius, 0.0)
                    && let Some(score) =
                        raster.cached_footprint(FootprintMode::OrientedByPath, waypoint.position)
                {
                    return Ok(self.verdict(score));
                }
                travel_heading(positions, i)
            }
        };
        self.is_traversable_footprint(Pose2::new(waypoint.position, yaw))
    }
}
