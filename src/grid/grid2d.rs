use glam::{DVec2, IVec2, UVec2};
use rayon::prelude::*;

use crate::types::{MapInfo, TraversabilityError};

/// Dense row-major raster layer. Cells are addressed as `UVec2 { x: column, y: row }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2d<T> {
    info: MapInfo,
    data: Vec<T>,
}

impl<T> Grid2d<T> {
    pub fn new(info: MapInfo, data: Vec<T>) -> Result<Self, TraversabilityError> {
        let expected_len = info.len();
        if data.len() != expected_len {
            return Err(TraversabilityError::GeometryMismatch(format!(
                "data length {} does not match map size {}",
                data.len(),
                expected_len
            )));
        }

        Ok(Self { info, data })
    }

    pub fn filled(info: MapInfo, value: T) -> Self
    where
        T: Clone,
    {
        let data = vec![value; info.len()];
        Self { info, data }
    }

    pub fn info(&self) -> &MapInfo {
        &self.info
    }

    pub fn width(&self) -> u32 {
        self.info.width
    }

    pub fn height(&self) -> u32 {
        self.info.height
    }

    pub fn get(&self, pos: UVec2) -> Option<&T> {
        if !self.info.contains_cell(pos) {
            return None;
        }
        Some(&self.data[self.index(pos)])
    }

    pub fn set(&mut self, pos: UVec2, value: T) -> Result<(), TraversabilityError> {
        if !self.info.contains_cell(pos) {
            return Err(TraversabilityError::OutOfBounds(format!(
                "cell ({}, {}) out of bounds for map {}x{}",
                pos.x, pos.y, self.info.width, self.info.height
            )));
        }
        let idx = self.index(pos);
        self.data[idx] = value;
        Ok(())
    }

    /// Fill every cell with `value`.
    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        self.data.fill(value);
    }

    #[inline]
    pub fn index(&self, pos: UVec2) -> usize {
        (pos.y as usize) * (self.info.width as usize) + (pos.x as usize)
    }

    /// Inverse of [`Grid2d::index`].
    #[inline]
    pub fn cell(&self, index: usize) -> UVec2 {
        let width = self.info.width as usize;
        UVec2::new((index % width) as u32, (index / width) as u32)
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// All cells in storage order.
    pub fn cells(&self) -> impl Iterator<Item = UVec2> + '_ {
        (0..self.data.len()).map(|i| self.cell(i))
    }
}

impl Grid2d<f64> {
    /// Build a layer by evaluating `f` for every cell, in parallel.
    ///
    /// `f` must be a pure function of the cell; the result does not depend on scheduling.
    pub fn par_from_fn<F>(info: MapInfo, f: F) -> Self
    where
        F: Fn(UVec2) -> f64 + Sync + Send,
    {
        let width = info.width as usize;
        let data = (0..info.len())
            .into_par_iter()
            .map(|i| f(UVec2::new((i % width) as u32, (i / width) as u32)))
            .collect();
        Self { info, data }
    }

    /// Value at `pos` if it is inside the map and known.
    pub fn known(&self, pos: UVec2) -> Option<f64> {
        self.get(pos).copied().filter(|v| !v.is_nan())
    }

    /// Surface gradient (rise per meter) at `cell` from central differences.
    ///
    /// Falls back to one-sided differences at map borders and next to unknown
    /// cells; an axis with no known neighbor contributes zero. `None` if the
    /// cell itself is unknown.
    pub fn gradient(&self, cell: UVec2) -> Option<DVec2> {
        let center = self.known(cell)?;
        let resolution = self.info.resolution;
        let axis = |delta: IVec2| -> f64 {
            let prev = self
                .info
                .offset_cell(cell, -delta)
                .and_then(|c| self.known(c));
            let next = self
                .info
                .offset_cell(cell, delta)
                .and_then(|c| self.known(c));
            match (prev, next) {
                (Some(p), Some(n)) => (n - p) / (2.0 * resolution),
                (Some(p), None) => (center - p) / resolution,
                (None, Some(n)) => (n - center) / resolution,
                (None, None) => 0.0,
            }
        };
        Some(DVec2::new(axis(IVec2::X), axis(IVec2::Y)))
    }

    /// Slope angle (radians) of the surface at `cell`.
    pub fn slope_angle(&self, cell: UVec2) -> Option<f64> {
        self.gradient(cell).map(|g| g.length().atan())
    }
}
