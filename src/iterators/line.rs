use glam::DVec2;

/// Evenly spaced sample positions along a segment, both endpoints included.
///
/// The segment is split into `ceil(length / spacing)` equal steps so the actual
/// spacing never exceeds the requested one.
pub struct LineSampler {
    start: DVec2,
    step: DVec2,
    count: u32,
    index: u32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LineSample {
    pub position: DVec2,
    /// Distance from the segment start (meters).
    pub t: f64,
}

impl LineSampler {
    pub fn new(start: DVec2, end: DVec2, spacing: f64) -> Self {
        let delta = end - start;
        let length = delta.length();
        let steps = if length == 0.0 || spacing <= 0.0 || !spacing.is_finite() {
            0
        } else {
            (length / spacing).ceil().max(1.0) as u32
        };
        let step = if steps == 0 {
            DVec2::ZERO
        } else {
            delta / steps as f64
        };
        Self {
            start,
            step,
            count: steps + 1,
            index: 0,
        }
    }

    /// Unit vector from start to end (zero for a degenerate segment).
    pub fn direction(&self) -> DVec2 {
        self.step.normalize_or_zero()
    }

    /// Distance between consecutive samples.
    pub fn step_length(&self) -> f64 {
        self.step.length()
    }
}

impl Iterator for LineSampler {
    type Item = LineSample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let offset = self.step * self.index as f64;
        self.index += 1;
        Some(LineSample {
            position: self.start + offset,
            t: offset.length(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.index) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LineSampler {}
