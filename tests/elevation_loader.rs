use std::path::Path;

use approx::assert_relative_eq;
use glam::{DVec2, UVec2};
use traversability::load_elevation_map;
use traversability::types::{LAYER_ELEVATION, TraversabilityError};
use traversability::visualization::{layer_to_image, save_layer_preview};

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

#[test]
fn loads_height_image() {
    let map = load_elevation_map(fixture("terrain.yaml")).expect("map should load");

    assert_eq!(map.width(), 3);
    assert_eq!(map.height(), 2);
    assert_relative_eq!(map.resolution(), 0.5);
    assert_eq!(map.info().origin, DVec2::new(-1.0, 2.0));
    assert_eq!(map.info().frame_id, "map");

    let at = |x, y| map.at(LAYER_ELEVATION, UVec2::new(x, y)).unwrap();
    // The top image row is the highest grid row.
    assert_relative_eq!(at(0, 1), 0.0);
    assert_relative_eq!(at(1, 1), 1.0);
    assert!(at(2, 1).is_nan());
    assert_relative_eq!(at(0, 0), 0.2, epsilon = 1e-9);
    assert_relative_eq!(at(1, 0), 0.4, epsilon = 1e-9);
    assert_relative_eq!(at(2, 0), 1.0);
}

#[test]
fn missing_descriptor_is_io_error() {
    let err = load_elevation_map(fixture("missing.yaml")).unwrap_err();
    assert!(matches!(err, TraversabilityError::Io(_)));
}

#[test]
fn preview_round_trips_through_image() {
    let map = load_elevation_map(fixture("terrain.yaml")).unwrap();
    let grid = map.layer(LAYER_ELEVATION).unwrap();
    let img = layer_to_image(grid, 0.0, 1.0);

    // Same orientation as the source image.
    assert_eq!(img.get_pixel(0, 0).0[0], 0);
    assert_eq!(img.get_pixel(1, 0).0[0], 254);
    assert_eq!(img.get_pixel(2, 0).0[0], 205);
    assert_eq!(img.get_pixel(2, 1).0[0], 254);

    let out = std::env::temp_dir().join("traversability_preview_test.png");
    save_layer_preview(&map, LAYER_ELEVATION, &out).unwrap();
    let reloaded = image::open(&out).unwrap().to_luma8();
    assert_eq!(reloaded.dimensions(), (3, 2));
    let _ = std::fs::remove_file(out);
}
