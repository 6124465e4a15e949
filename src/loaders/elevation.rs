//! Elevation maps stored as a YAML descriptor next to a grayscale height image.
//!
//! ```yaml
//! image: terrain.png
//! resolution: 0.05
//! origin: [-2.0, -2.0]
//! frame_id: map
//! min_height: 0.0
//! max_height: 0.5
//! ```
//!
//! Black pixels are `min_height`, white pixels `max_height`. Pixels that are not
//! fully opaque are unknown. The first image row is the top of the map.

use std::path::{Path, PathBuf};

use glam::DVec2;
use image::GenericImageView;
use serde::Deserialize;

use crate::grid::RasterMap;
use crate::types::{LAYER_ELEVATION, MapInfo, TraversabilityError, UNKNOWN};

#[derive(Debug, Deserialize)]
struct ElevationMetadata {
    image: String,
    resolution: f64,
    /// `[x, y]` or `[x, y, yaw]`; yaw must be zero.
    origin: Vec<f64>,
    #[serde(default = "default_frame_id")]
    frame_id: String,
    min_height: f64,
    max_height: f64,
    #[serde(default)]
    negate: bool,
}

fn default_frame_id() -> String {
    MapInfo::default().frame_id
}

impl ElevationMetadata {
    fn validate(&self) -> Result<DVec2, TraversabilityError> {
        let invalid = |msg: &str| Err(TraversabilityError::Config(msg.to_string()));
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return invalid("resolution must be positive");
        }
        if !(self.max_height > self.min_height) {
            return invalid("max_height must be greater than min_height");
        }
        match self.origin.as_slice() {
            [x, y] => Ok(DVec2::new(*x, *y)),
            [x, y, yaw] if *yaw == 0.0 => Ok(DVec2::new(*x, *y)),
            [_, _, _] => invalid("rotated map origins are not supported"),
            _ => invalid("origin must be [x, y] or [x, y, yaw]"),
        }
    }
}

/// Load an elevation raster with a single `elevation` layer.
pub fn load_elevation_map(yaml_path: impl AsRef<Path>) -> Result<RasterMap, TraversabilityError> {
    let yaml_path = yaml_path.as_ref();
    let yaml_str = std::fs::read_to_string(yaml_path)?;
    let metadata: ElevationMetadata = serde_yaml::from_str(&yaml_str)?;
    let origin = metadata.validate()?;

    let image_path = resolve_image_path(yaml_path, &metadata.image);
    let image = image::open(&image_path)?;
    let (width, height) = image.dimensions();
    let rgba = image.to_rgba8();
    let span = metadata.max_height - metadata.min_height;

    let mut data = vec![UNKNOWN; (width as usize) * (height as usize)];
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        if a < u8::MAX {
            continue;
        }
        let mut lightness = (r as f64 + g as f64 + b as f64) / (3.0 * 255.0);
        if metadata.negate {
            lightness = 1.0 - lightness;
        }
        let grid_y = height - y - 1;
        data[(grid_y as usize) * (width as usize) + (x as usize)] =
            metadata.min_height + lightness * span;
    }

    let info = MapInfo {
        width,
        height,
        resolution: metadata.resolution,
        origin,
        frame_id: metadata.frame_id,
    };
    log::debug!(
        "loaded {}x{} elevation map from {}",
        width,
        height,
        image_path.display()
    );

    let mut map = RasterMap::new(info);
    map.add_layer_data(LAYER_ELEVATION, data)?;
    Ok(map)
}

fn resolve_image_path(yaml_path: &Path, image_ref: &str) -> PathBuf {
    let image_path = PathBuf::from(image_ref);
    if image_path.is_absolute() {
        return image_path;
    }

    match yaml_path.parent() {
        Some(parent) => parent.join(image_path),
        None => image_path,
    }
}
