use glam::{DVec2, UVec2};

use crate::types::{MapInfo, Polygon};

/// Iterator over all grid cells whose centers lie inside a polygon.
///
/// Vertices are world coordinates (meters). Rows are scanned at the cell-center
/// height and filled between pairs of edge crossings (even-odd rule), so concave
/// polygons are handled. Only in-bounds cells are yielded.
pub struct PolygonIterator {
    points: Vec<DVec2>,
    y: i32,
    y_max: i32,
    width: i32,
    spans: Vec<(i32, i32)>,
    span: usize,
    x: i32,
}

impl PolygonIterator {
    pub fn new(info: &MapInfo, polygon: &Polygon) -> Option<Self> {
        if polygon.vertices.len() < 3 || info.is_empty() {
            return None;
        }
        let points: Vec<DVec2> = polygon
            .vertices
            .iter()
            .map(|p| info.world_to_map(*p))
            .collect();
        Some(Self::new_map(points, info.width, info.height))
    }

    fn new_map(points: Vec<DVec2>, width: u32, height: u32) -> Self {
        let (min_y, max_y) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min_y, max_y), p| {
                (min_y.min(p.y), max_y.max(p.y))
            });
        let y_min = ((min_y - 0.5).ceil() as i32).max(0);
        let y_max = ((max_y - 0.5).floor() as i32).min(height as i32 - 1);

        Self {
            points,
            y: y_min - 1,
            y_max,
            width: width as i32,
            spans: Vec::new(),
            span: 0,
            x: 0,
        }
    }

    /// Move to the next row that has at least one non-empty span.
    fn advance_row(&mut self) -> bool {
        while self.y < self.y_max {
            self.y += 1;
            let y_scan = self.y as f64 + 0.5;

            let mut xs = Vec::with_capacity(self.points.len());
            let n = self.points.len();
            for i in 0..n {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                if (a.y > y_scan) != (b.y > y_scan) {
                    let t = (y_scan - a.y) / (b.y - a.y);
                    xs.push(a.x + t * (b.x - a.x));
                }
            }
            xs.sort_by(f64::total_cmp);

            self.spans.clear();
            for pair in xs.chunks_exact(2) {
                // Centers strictly between the crossings.
                let x_start = ((pair[0] - 0.5).floor() as i32 + 1).max(0);
                let x_end = ((pair[1] - 0.5).ceil() as i32 - 1).min(self.width - 1);
                if x_start <= x_end {
                    self.spans.push((x_start, x_end));
                }
            }

            if let Some(&(x_start, _)) = self.spans.first() {
                self.span = 0;
                self.x = x_start;
                return true;
            }
        }

        false
    }
}

impl Iterator for PolygonIterator {
    type Item = UVec2;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(&(_, x_end)) = self.spans.get(self.span) {
                if self.x <= x_end {
                    let cell = UVec2::new(self.x as u32, self.y as u32);
                    self.x += 1;
                    return Some(cell);
                }
                self.span += 1;
                if let Some(&(x_start, _)) = self.spans.get(self.span) {
                    self.x = x_start;
                }
                continue;
            }

            if !self.advance_row() {
                return None;
            }
        }
    }
}
