pub mod circle;
pub mod line;
pub mod polygon;

pub use circle::AnnulusIterator;
pub use line::{LineSample, LineSampler};
pub use polygon::PolygonIterator;
