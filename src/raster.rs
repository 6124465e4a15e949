use glam::DVec2;

use crate::grid::{Grid2d, RasterMap};
use crate::types::{
    FOOTPRINT_LAYERS, LAYER_FOOTPRINT_FIXED, LAYER_FOOTPRINT_ORIENTED, LAYER_TRAVERSABILITY,
    TRAVERSABILITY_LAYERS, TraversabilityError, UNKNOWN,
};

/// Which precomputed footprint layer a value comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FootprintMode {
    /// Footprint polygon at this heading (radians).
    FixedHeading(f64),
    /// Orientation-invariant disk or annulus.
    OrientedByPath,
}

impl FootprintMode {
    pub fn layer(&self) -> &'static str {
        match self {
            FootprintMode::FixedHeading(_) => LAYER_FOOTPRINT_FIXED,
            FootprintMode::OrientedByPath => LAYER_FOOTPRINT_ORIENTED,
        }
    }
}

/// Parameters of the annulus stored in the `footprint_oriented` layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnulusParams {
    pub radius: f64,
    pub offset: f64,
}

/// Traversability layers plus the bookkeeping that travels with them.
#[derive(Debug, Clone, PartialEq)]
pub struct TraversabilityRaster {
    pub map: RasterMap,
    pub n_traversable: usize,
    pub n_not_traversable: usize,
    /// Heading used for `footprint_fixed`, if that layer is populated.
    pub fixed_heading: Option<f64>,
    /// Annulus used for `footprint_oriented`, if that layer is populated.
    pub oriented: Option<AnnulusParams>,
}

impl TraversabilityRaster {
    /// Wrap `map`, adding missing footprint layers as unknown and counting cells.
    pub fn new(mut map: RasterMap, threshold: f64) -> Result<Self, TraversabilityError> {
        map.validate_layers(TRAVERSABILITY_LAYERS)?;
        for layer in FOOTPRINT_LAYERS {
            if !map.exists(layer) {
                map.add_layer(layer, UNKNOWN);
            }
        }
        let mut raster = Self {
            map,
            n_traversable: 0,
            n_not_traversable: 0,
            fixed_heading: None,
            oriented: None,
        };
        raster.count_cells(threshold)?;
        Ok(raster)
    }

    pub fn traversability(&self) -> Result<&Grid2d<f64>, TraversabilityError> {
        self.map.layer(LAYER_TRAVERSABILITY)
    }

    /// Recount known cells: at or above `threshold` is traversable.
    pub fn count_cells(&mut self, threshold: f64) -> Result<(), TraversabilityError> {
        let (good, bad) = self
            .traversability()?
            .data()
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0, 0), |(good, bad), &v| {
                if v >= threshold { (good + 1, bad) } else { (good, bad + 1) }
            });
        self.n_traversable = good;
        self.n_not_traversable = bad;
        Ok(())
    }

    /// Share of known cells that are traversable; 0 when nothing is known.
    pub fn traversable_fraction(&self) -> f64 {
        let total = self.n_traversable + self.n_not_traversable;
        if total == 0 {
            0.0
        } else {
            self.n_traversable as f64 / total as f64
        }
    }

    /// Clear both footprint layers and their metadata.
    pub fn reset_footprint_layers(&mut self) {
        for layer in FOOTPRINT_LAYERS {
            self.map.add_layer(layer, UNKNOWN);
        }
        self.fixed_heading = None;
        self.oriented = None;
    }

    /// Precomputed score at `position` if the layer for `mode` holds a known value there.
    pub fn cached_footprint(&self, mode: FootprintMode, position: DVec2) -> Option<f64> {
        self.map
            .at_position(mode.layer(), position)
            .ok()
            .flatten()
            .filter(|v| !v.is_nan())
    }
}
