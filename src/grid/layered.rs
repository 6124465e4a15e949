//! Named-layer raster: several `Grid2d<f64>` layers sharing one `MapInfo`.
//!
//! Every layer is checked against the raster's geometry when it is added, so a
//! `RasterMap` never holds layers of different size, resolution or frame.

use std::collections::BTreeMap;

use glam::{DVec2, UVec2};

use crate::grid::Grid2d;
use crate::types::{MapInfo, TraversabilityError, UNKNOWN};

#[derive(Debug, Clone, PartialEq)]
pub struct RasterMap {
    info: MapInfo,
    layers: BTreeMap<String, Grid2d<f64>>,
}

impl RasterMap {
    pub fn new(info: MapInfo) -> Self {
        Self {
            info,
            layers: BTreeMap::new(),
        }
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

    pub fn resolution(&self) -> f64 {
        self.info.resolution
    }

    /// Add a layer filled with `value`, replacing any layer of the same name.
    pub fn add_layer(&mut self, name: &str, value: f64) {
        self.layers
            .insert(name.to_string(), Grid2d::filled(self.info.clone(), value));
    }

    /// Add a layer from raw row-major values.
    pub fn add_layer_data(&mut self, name: &str, data: Vec<f64>) -> Result<(), TraversabilityError> {
        let grid = Grid2d::new(self.info.clone(), data)?;
        self.layers.insert(name.to_string(), grid);
        Ok(())
    }

    /// Insert an existing grid. Its geometry must match the raster exactly.
    pub fn insert_layer(&mut self, name: &str, grid: Grid2d<f64>) -> Result<(), TraversabilityError> {
        if grid.info() != &self.info {
            return Err(TraversabilityError::GeometryMismatch(format!(
                "layer '{}' has geometry {:?}, raster has {:?}",
                name,
                grid.info(),
                self.info
            )));
        }
        self.layers.insert(name.to_string(), grid);
        Ok(())
    }

    pub fn remove_layer(&mut self, name: &str) -> Option<Grid2d<f64>> {
        self.layers.remove(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    pub fn layer(&self, name: &str) -> Result<&Grid2d<f64>, TraversabilityError> {
        self.layers
            .get(name)
            .ok_or_else(|| TraversabilityError::MissingLayer(name.to_string()))
    }

    pub fn layer_mut(&mut self, name: &str) -> Result<&mut Grid2d<f64>, TraversabilityError> {
        self.layers
            .get_mut(name)
            .ok_or_else(|| TraversabilityError::MissingLayer(name.to_string()))
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// Raw value of `layer` at `cell`; `UNKNOWN` outside the map.
    pub fn at(&self, layer: &str, cell: UVec2) -> Result<f64, TraversabilityError> {
        Ok(self.layer(layer)?.get(cell).copied().unwrap_or(UNKNOWN))
    }

    /// Raw value of `layer` at the cell containing `position`; `None` outside the map.
    pub fn at_position(&self, layer: &str, position: DVec2) -> Result<Option<f64>, TraversabilityError> {
        let grid = self.layer(layer)?;
        Ok(self
            .info
            .world_to_cell(position)
            .and_then(|cell| grid.get(cell).copied()))
    }

    /// Fail with `MissingLayer` naming the first required layer that is absent.
    pub fn validate_layers(&self, required: &[&str]) -> Result<(), TraversabilityError> {
        match required.iter().find(|name| !self.exists(name)) {
            Some(name) => Err(TraversabilityError::MissingLayer(name.to_string())),
            None => Ok(()),
        }
    }

    /// Fail with `GeometryMismatch` unless `other` lies on the same lattice.
    pub fn check_geometry(&self, other: &MapInfo) -> Result<(), TraversabilityError> {
        if self.info.same_geometry(other) {
            Ok(())
        } else {
            Err(TraversabilityError::GeometryMismatch(format!(
                "{}x{} @ {} m in '{}' does not match {}x{} @ {} m in '{}'",
                self.info.width,
                self.info.height,
                self.info.resolution,
                self.info.frame_id,
                other.width,
                other.height,
                other.resolution,
                other.frame_id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> MapInfo {
        MapInfo {
            width: 3,
            height: 2,
            resolution: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn insert_layer_rejects_other_geometry() {
        let mut map = RasterMap::new(info());
        let other = Grid2d::filled(MapInfo::square(3, 0.5), 0.0);
        assert!(matches!(
            map.insert_layer("elevation", other),
            Err(TraversabilityError::GeometryMismatch(_))
        ));
        assert!(!map.exists("elevation"));
    }

    #[test]
    fn validate_layers_reports_first_missing() {
        let mut map = RasterMap::new(info());
        map.add_layer("elevation", 0.0);
        assert!(map.validate_layers(&["elevation"]).is_ok());
        match map.validate_layers(&["elevation", "step", "slope"]) {
            Err(TraversabilityError::MissingLayer(name)) => assert_eq!(name, "step"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn at_position_reads_containing_cell() {
        let mut map = RasterMap::new(info());
        map.add_layer_data("elevation", vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0])
            .unwrap();
        assert_eq!(
            map.at_position("elevation", DVec2::new(1.2, 0.7)).unwrap(),
            Some(5.0)
        );
        assert_eq!(
            map.at_position("elevation", DVec2::new(-1.0, 0.0)).unwrap(),
            None
        );
        assert!(map.at("missing", UVec2::ZERO).is_err());
    }
}
