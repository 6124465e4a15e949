//! Geometric and query types shared by the evaluator, precomputer and manager.

use glam::DVec2;

/// Robot pose in world coordinates (meters).
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Pose2 {
    pub position: DVec2,
    pub yaw: f64,
}

impl Pose2 {
    pub fn new(position: DVec2, yaw: f64) -> Self {
        Self { position, yaw }
    }
}

/// Closed polygon in world coordinates (meters). The last vertex connects to the first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon {
    pub vertices: Vec<DVec2>,
}

impl Polygon {
    pub fn new(vertices: Vec<DVec2>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned bounds `(min, max)`, or `None` for an empty polygon.
    pub fn bounding_box(&self) -> Option<(DVec2, DVec2)> {
        let first = *self.vertices.first()?;
        Some(
            self.vertices
                .iter()
                .fold((first, first), |(min, max), v| (min.min(*v), max.max(*v))),
        )
    }

    /// Mean of the vertices. Well defined for zero-area polygons.
    pub fn centroid(&self) -> Option<DVec2> {
        if self.vertices.is_empty() {
            return None;
        }
        let sum: DVec2 = self.vertices.iter().copied().sum();
        Some(sum / self.vertices.len() as f64)
    }

    /// Even-odd point-in-polygon test. Points on an edge may land on either side.
    pub fn contains(&self, point: DVec2) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[j];
            if (a.y > point.y) != (b.y > point.y) {
                let x = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if point.x < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// Robot footprint: polygon vertices in the robot frame (meters).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Footprint {
    pub points: Vec<DVec2>,
}

impl Footprint {
    pub fn new(points: Vec<DVec2>) -> Self {
        Self { points }
    }

    /// Rectangle centered on the robot origin, `length` along x and `width` along y.
    pub fn rectangle(length: f64, width: f64) -> Self {
        let hl = 0.5 * length;
        let hw = 0.5 * width;
        Self {
            points: vec![
                DVec2::new(hl, hw),
                DVec2::new(-hl, hw),
                DVec2::new(-hl, -hw),
                DVec2::new(hl, -hw),
            ],
        }
    }

    /// Place the footprint at `pose` in the map frame.
    pub fn transform(&self, pose: Pose2) -> Polygon {
        let rotation = DVec2::from_angle(pose.yaw);
        Polygon::new(
            self.points
                .iter()
                .map(|p| pose.position + rotation.rotate(*p))
                .collect(),
        )
    }
}

/// Which heading convention a path query uses for its footprint.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum HeadingMode {
    /// Every waypoint uses the same heading; served by the `footprint_fixed` layer.
    FixedHeading(f64),
    /// Heading follows each waypoint's yaw or the direction of travel; served by the
    /// orientation-invariant `footprint_oriented` layer.
    #[default]
    OrientedByPath,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: DVec2,
    /// Heading override for this waypoint.
    pub yaw: Option<f64>,
    /// When set, the waypoint is checked with a disk of this radius instead of the footprint.
    pub radius: Option<f64>,
}

impl Waypoint {
    pub fn new(position: DVec2) -> Self {
        Self {
            position,
            yaw: None,
            radius: None,
        }
    }

    pub fn with_yaw(mut self, yaw: f64) -> Self {
        self.yaw = Some(yaw);
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FootprintPath {
    pub waypoints: Vec<Waypoint>,
    pub heading: HeadingMode,
}

impl FootprintPath {
    pub fn new(waypoints: Vec<Waypoint>, heading: HeadingMode) -> Self {
        Self { waypoints, heading }
    }

    pub fn from_positions(positions: &[DVec2], heading: HeadingMode) -> Self {
        Self {
            waypoints: positions.iter().copied().map(Waypoint::new).collect(),
            heading,
        }
    }
}

/// Verdict and mean score of a polygon or disk query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonResult {
    pub traversable: bool,
    pub score: f64,
}

/// Verdict, mean score and per-waypoint scores of a path query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraversabilityResult {
    pub traversable: bool,
    pub score: f64,
    pub per_waypoint_scores: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn contains_handles_concave_polygon() {
        // L-shape missing the upper-right quadrant.
        let poly = Polygon::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(2.0, 1.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(1.0, 2.0),
            DVec2::new(0.0, 2.0),
        ]);
        assert!(poly.contains(DVec2::new(0.5, 0.5)));
        assert!(poly.contains(DVec2::new(1.5, 0.5)));
        assert!(poly.contains(DVec2::new(0.5, 1.5)));
        assert!(!poly.contains(DVec2::new(1.5, 1.5)));
    }

    #[test]
    fn footprint_transform_rotates_then_translates() {
        let footprint = Footprint::rectangle(2.0, 1.0);
        let poly = footprint.transform(Pose2::new(DVec2::new(5.0, 5.0), FRAC_PI_2));
        let (min, max) = poly.bounding_box().unwrap();
        assert_relative_eq!(min.x, 4.5, epsilon = 1e-12);
        assert_relative_eq!(max.x, 5.5, epsilon = 1e-12);
        assert_relative_eq!(min.y, 4.0, epsilon = 1e-12);
        assert_relative_eq!(max.y, 6.0, epsilon = 1e-12);
    }

    #[test]
    fn centroid_of_collapsed_polygon_is_the_point() {
        let p = DVec2::new(1.25, -0.5);
        let poly = Polygon::new(vec![p, p, p]);
        assert_eq!(poly.centroid(), Some(p));
        assert_eq!(Polygon::default().centroid(), None);
    }
}
