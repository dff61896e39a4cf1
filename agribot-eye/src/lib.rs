//! agribot-eye: perception side of the agribot control loop
//!
//! Captures a frame, hands it to an instance-segmentation model, reduces each
//! instance polygon to its area-weighted centroid and quantizes the centroids
//! onto the actuator grid. A debug overlay of every cycle is rendered off the
//! hot path and handed to a persistence sink.

pub mod camera;
pub mod config;
pub mod debug;
pub mod error;
pub mod models;
pub mod processing;

pub use camera::{DisabledSource, Frame, FrameSource, SnapshotSource, StillImageSource};
pub use config::{CaptureConfig, InferenceConfig, VisionConfig};
pub use debug::{DebugSink, FileDebugSink, MemoryDebugSink};
pub use error::VisionError;
pub use models::{RemoteSegmenter, Segment, SegmentationModel};
pub use processing::{DetectionPipeline, GridMapper};
