pub mod classify;
pub mod config;
pub mod evaluate;
pub mod footprint;
pub mod grid;
pub mod iterators;
pub mod loaders;
pub mod manager;
pub mod pipeline;
pub mod raster;
pub mod types;
pub mod visualization;

pub use config::TraversabilityConfig;
pub use evaluate::Evaluator;
pub use grid::{Grid2d, RasterMap};
pub use loaders::load_elevation_map;
pub use manager::TraversabilityMap;
pub use pipeline::{Pipeline, Stage, StageConfig, StageRegistry};
pub use raster::{FootprintMode, TraversabilityRaster};
pub use types::{MapInfo, TraversabilityError};
