//! Map metadata.

use glam::{DVec2, IVec2, UVec2};

#[derive(Debug, Clone, PartialEq)]
pub struct MapInfo {
    pub width: u32,
    pub height: u32,
    pub resolution: f64,
    /// World position of the lower-left corner of cell (0, 0) (meters).
    pub origin: DVec2,
    /// Reference frame the raster is expressed in.
    pub frame_id: String,
}

impl Default for MapInfo {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            resolution: 0.05,
            origin: DVec2::ZERO,
            frame_id: "map".to_string(),
        }
    }
}

impl MapInfo {
    pub fn square(width: u32, resolution: f64) -> Self {
        Self {
            width,
            height: width,
            resolution,
            ..Default::default()
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn contains_cell(&self, cell: UVec2) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    /// `cell + delta`, or `None` if that leaves the map.
    #[inline]
    pub fn offset_cell(&self, cell: UVec2, delta: IVec2) -> Option<UVec2> {
        let x = cell.x as i64 + delta.x as i64;
        let y = cell.y as i64 + delta.y as i64;
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(UVec2::new(x as u32, y as u32))
    }

    /// World position of the center of `cell`.
    #[inline]
    pub fn cell_center(&self, cell: UVec2) -> DVec2 {
        self.origin + (cell.as_dvec2() + DVec2::splat(0.5)) * self.resolution
    }

    /// Continuous map coordinates (cells) of a world position, without bounds checks.
    #[inline]
    pub fn world_to_map(&self, pos: DVec2) -> DVec2 {
        (pos - self.origin) / self.resolution
    }

    /// Cell containing a world position, or `None` outside the map.
    pub fn world_to_cell(&self, pos: DVec2) -> Option<UVec2> {
        let m = self.world_to_map(pos);
        if m.x < 0.0 || m.y < 0.0 || m.x >= self.width as f64 || m.y >= self.height as f64 {
            return None;
        }
        Some(UVec2::new(m.x as u32, m.y as u32))
    }

    /// True if both infos describe the same lattice: resolution, dimensions and frame.
    ///
    /// The origin is allowed to differ so that a moving map window still matches.
    pub fn same_geometry(&self, other: &MapInfo) -> bool {
        self.width == other.width
            && self.height == other.height
            && (self.resolution - other.resolution).abs() <= f64::EPSILON * self.resolution
            && self.frame_id == other.frame_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_center_round_trips_through_world_to_cell() {
        let info = MapInfo {
            width: 10,
            height: 8,
            resolution: 0.5,
            origin: DVec2::new(-1.0, -2.0),
            ..Default::default()
        };
        let cell = UVec2::new(3, 5);
        let center = info.cell_center(cell);
        assert_eq!(center, DVec2::new(0.75, 0.75));
        assert_eq!(info.world_to_cell(center), Some(cell));
    }

    #[test]
    fn world_to_cell_rejects_outside() {
        let info = MapInfo::square(4, 1.0);
        assert_eq!(info.world_to_cell(DVec2::new(-0.1, 0.5)), None);
        assert_eq!(info.world_to_cell(DVec2::new(4.0, 0.5)), None);
        assert_eq!(info.world_to_cell(DVec2::new(3.99, 3.99)), Some(UVec2::new(3, 3)));
    }

    #[test]
    fn offset_cell_stays_inside() {
        let info = MapInfo::square(3, 1.0);
        let cell = UVec2::new(0, 2);
        assert_eq!(info.offset_cell(cell, IVec2::new(1, -1)), Some(UVec2::new(1, 1)));
        assert_eq!(info.offset_cell(cell, IVec2::new(-1, 0)), None);
        assert_eq!(info.offset_cell(cell, IVec2::new(0, 1)), None);
    }

    #[test]
    fn same_geometry_ignores_origin_but_not_frame() {
        let a = MapInfo::square(4, 0.1);
        let mut b = a.clone();
        b.origin = DVec2::new(5.0, 5.0);
        assert!(a.same_geometry(&b));
        b.frame_id = "odom".to_string();
        assert!(!a.same_geometry(&b));
    }
}
