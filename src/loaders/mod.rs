pub mod elevation;

pub use elevation::load_elevation_map;
