pub mod constants;
pub mod error;
pub mod geometry;
pub mod info;

pub use constants::*;
pub use error::TraversabilityError;
pub use geometry::{
    Footprint, FootprintPath, HeadingMode, Polygon, PolygonResult, Pose2, TraversabilityResult,
    Waypoint,
};
pub use info::MapInfo;
