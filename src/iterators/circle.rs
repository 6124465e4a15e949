use glam::{DVec2, UVec2};

use crate::types::MapInfo;

/// Iterator over grid cells whose centers lie in the ring `radius_min <= d <= radius_max`
/// around `center` (world coordinates, meters).
///
/// With `radius_min == 0` this is a plain disk.
pub struct AnnulusIterator {
    center: DVec2,
    min_sq: f64,
    max_sq: f64,
    info: MapInfo,
    x_min: u32,
    x_max: u32,
    y_max: u32,
    cell: UVec2,
    done: bool,
}

impl AnnulusIterator {
    pub fn new(info: &MapInfo, center: DVec2, radius_max: f64, radius_min: f64) -> Self {
        let radius_min = radius_min.max(0.0);
        let lo = info.world_to_map(center - DVec2::splat(radius_max)).floor();
        let hi = info.world_to_map(center + DVec2::splat(radius_max)).floor();

        let x_min = lo.x.max(0.0) as i64;
        let y_min = lo.y.max(0.0) as i64;
        let x_max = (hi.x as i64).min(info.width as i64 - 1);
        let y_max = (hi.y as i64).min(info.height as i64 - 1);
        let done = radius_max < radius_min || x_min > x_max || y_min > y_max;

        Self {
            center,
            min_sq: radius_min * radius_min,
            max_sq: radius_max * radius_max,
            info: info.clone(),
            x_min: x_min.max(0) as u32,
            x_max: x_max.max(0) as u32,
            y_max: y_max.max(0) as u32,
            cell: UVec2::new(x_min.max(0) as u32, y_min.max(0) as u32),
            done,
        }
    }

    fn step(&mut self) {
        if self.cell.x < self.x_max {
            self.cell.x += 1;
        } else if self.cell.y < self.y_max {
            self.cell.x = self.x_min;
            self.cell.y += 1;
        } else {
            self.done = true;
        }
    }
}

impl Iterator for AnnulusIterator {
    type Item = UVec2;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let cell = self.cell;
            self.step();
            let d_sq = self.info.cell_center(cell).distance_squared(self.center);
            if d_sq >= self.min_sq && d_sq <= self.max_sq {
                return Some(cell);
            }
        }
        None
    }
}
