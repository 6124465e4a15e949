use std::path::Path;

use glam::UVec2;
use image::{GrayImage, Luma};

use crate::grid::{Grid2d, RasterMap};
use crate::types::{LAYER_TRAVERSABILITY, TraversabilityError, UNKNOWN};

const UNKNOWN_GRAY: u8 = 205;

/// Convert a layer to a grayscale image preview.
///
/// Values are scaled linearly from `[min, max]` to black..white and clamped.
/// Unknown cells become mid-gray. The grid's `y = 0` row (lowest in map
/// coordinates) is written to the **bottom** of the image.
pub fn layer_to_image(grid: &Grid2d<f64>, min: f64, max: f64) -> GrayImage {
    let width = grid.width();
    let height = grid.height();
    let mut img = GrayImage::new(width, height);

    for y_img in 0..height {
        // Flip vertically to match the loader's map coordinate convention.
        let y_grid = height - 1 - y_img;
        for x in 0..width {
            let value = grid
                .get(UVec2::new(x, y_grid))
                .copied()
                .unwrap_or(UNKNOWN);
            img.put_pixel(x, y_img, Luma([value_to_gray(value, min, max)]));
        }
    }

    img
}

/// Preview of the `traversability` layer: black is not traversable, white is traversable.
pub fn traversability_to_image(map: &RasterMap) -> Result<GrayImage, TraversabilityError> {
    Ok(layer_to_image(map.layer(LAYER_TRAVERSABILITY)?, 0.0, 1.0))
}

/// Write a preview of `layer`, scaled to the range of its known values.
pub fn save_layer_preview(
    map: &RasterMap,
    layer: &str,
    path: impl AsRef<Path>,
) -> Result<(), TraversabilityError> {
    let grid = map.layer(layer)?;
    let (min, max) = grid
        .data()
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let (min, max) = if min < max { (min, max) } else { (min - 1.0, min + 1.0) };
    layer_to_image(grid, min, max).save(path)?;
    Ok(())
}

fn value_to_gray(value: f64, min: f64, max: f64) -> u8 {
    if value.is_nan() {
        return UNKNOWN_GRAY;
    }
    if max <= min {
        return 0;
    }
    let ratio = ((value - min) / (max - min)).clamp(0.0, 1.0);
    (ratio * 254.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MapInfo;

    #[test]
    fn layer_to_image_maps_values_and_flips_y() {
        // y=1: [0.0, 1.0]
        // y=0: [UNKNOWN, 1.0]
        let info = MapInfo {
            width: 2,
            height: 2,
            resolution: 1.0,
            ..Default::default()
        };
        let grid = Grid2d::new(info, vec![UNKNOWN, 1.0, 0.0, 1.0]).unwrap();

        let img = layer_to_image(&grid, 0.0, 1.0);
        assert_eq!(img.dimensions(), (2, 2));

        // Because we flip Y: image y=0 corresponds to grid y=1.
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(0, 1).0[0], UNKNOWN_GRAY);
        assert_eq!(img.get_pixel(1, 1).0[0], 254);
    }

    #[test]
    fn values_outside_range_are_clamped() {
        assert_eq!(value_to_gray(-3.0, 0.0, 1.0), 0);
        assert_eq!(value_to_gray(7.0, 0.0, 1.0), 254);
        assert_eq!(value_to_gray(0.5, 0.0, 1.0), 127);
    }
}
