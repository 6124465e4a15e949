use glam::UVec2;

use super::{EPSILON, NeighborhoodClassifier, cell_offset};
use crate::grid::Grid2d;

impl NeighborhoodClassifier {
    /// `false` if `cell` sits on a height discontinuity wider than the gap width.
    ///
    /// The anchors are the cell itself and every higher window neighbor. From
    /// each anchor, each lower window neighbor starts a straight walk away from
    /// the anchor; the drop is a step only if the far end of the walk is still
    /// low. Narrow pits end high and are ignored.
    pub fn check_for_step(&self, elevation: &Grid2d<f64>, cell: UVec2) -> bool {
        let Some(height) = elevation.known(cell) else {
            return true;
        };
        let info = elevation.info();
        let threshold = self.step_height_threshold;

        let higher = self.step_window.iter().filter_map(|&d| {
            let neighbor = info.offset_cell(cell, d)?;
            let h = elevation.known(neighbor)?;
            (h > height + threshold).then_some((neighbor, h))
        });

        for (anchor, anchor_height) in std::iter::once((cell, height)).chain(higher) {
            let toward_cell = cell_offset(anchor, cell);
            for &d in &self.step_window {
                if anchor != cell && toward_cell.dot(d) < 0 {
                    continue;
                }
                let Some(first) = info.offset_cell(anchor, d) else {
                    continue;
                };
                if !elevation
                    .known(first)
                    .is_some_and(|h| h < anchor_height - threshold)
                {
                    continue;
                }

                let step_length = d.as_dvec2().length();
                let mut last = Some(first);
                let mut k = 1;
                while (k + 1) as f64 * step_length <= self.max_gap_cells + EPSILON {
                    last = info.offset_cell(anchor, d * (k + 1));
                    if last.is_none() {
                        break;
                    }
                    k += 1;
                }
                // A walk that leaves the map cannot confirm the drop.
                let Some(last) = last else {
                    continue;
                };

                if elevation
                    .known(last)
                    .is_some_and(|h| h < anchor_height - threshold)
                {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraversabilityConfig;
    use crate::types::{MapInfo, UNKNOWN};

    fn classifier() -> NeighborhoodClassifier {
        // 0.1 m steps, 0.3 m gaps, 0.1 m cells.
        NeighborhoodClassifier::new(&TraversabilityConfig::default(), 0.1)
    }

    fn grid_with(size: u32, cells: &[(u32, u32, f64)]) -> Grid2d<f64> {
        let mut grid = Grid2d::filled(MapInfo::square(size, 0.1), 0.0);
        for &(x, y, h) in cells {
            grid.set(UVec2::new(x, y), h).unwrap();
        }
        grid
    }

    #[test]
    fn raised_cell_is_a_step_for_itself_and_neighbors() {
        let grid = grid_with(5, &[(2, 2, 0.3)]);
        let c = classifier();
        for y in 0..5u32 {
            for x in 0..5u32 {
                let near = x.abs_diff(2) <= 1 && y.abs_diff(2) <= 1;
                assert_eq!(c.check_for_step(&grid, UVec2::new(x, y)), !near, "cell ({x}, {y})");
            }
        }
    }

    #[test]
    fn narrow_pit_is_not_a_step() {
        let grid = grid_with(7, &[(3, 3, -0.3)]);
        let c = classifier();
        for cell in grid.cells() {
            assert!(c.check_for_step(&grid, cell), "cell {cell}");
        }
    }

    #[test]
    fn pit_on_the_border_is_not_a_step() {
        let grid = grid_with(7, &[(0, 3, -0.3)]);
        let c = classifier();
        for cell in grid.cells() {
            assert!(c.check_for_step(&grid, cell), "cell {cell}");
        }
    }

    #[test]
    fn plateau_edge_is_a_step() {
        let mut grid = grid_with(8, &[]);
        let plateau: Vec<UVec2> = grid.cells().filter(|c| c.x >= 4).collect();
        for cell in plateau {
            grid.set(cell, 0.5).unwrap();
        }
        let c = classifier();
        assert!(!c.check_for_step(&grid, UVec2::new(4, 4)));
        assert!(!c.check_for_step(&grid, UVec2::new(3, 4)));
        assert!(c.check_for_step(&grid, UVec2::new(1, 4)));
        assert!(c.check_for_step(&grid, UVec2::new(6, 4)));
    }

    #[test]
    fn small_height_change_is_not_a_step() {
        let grid = grid_with(5, &[(2, 2, 0.05)]);
        assert!(classifier().check_for_step(&grid, UVec2::new(2, 2)));
    }

    #[test]
    fn unknown_cell_passes() {
        let grid = grid_with(5, &[(2, 2, UNKNOWN), (2, 3, 0.5)]);
        assert!(classifier().check_for_step(&grid, UVec2::new(2, 2)));
    }
}
