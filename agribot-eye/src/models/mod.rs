//! Instance segmentation collaborators

pub mod remote;
pub mod segment;

pub use remote::RemoteSegmenter;
pub use segment::{Segment, SegmentationModel};
