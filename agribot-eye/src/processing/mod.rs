//! Vision processing pipelines

pub mod centroid;
pub mod detection;
pub mod grid;
pub mod overlay;

pub use centroid::polygon_centroid;
pub use detection::{Detection, DetectionPipeline};
pub use grid::GridMapper;
