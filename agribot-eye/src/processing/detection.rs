//! One perception cycle: capture, segment, reduce, quantize

use crate::camera::{self, encode_jpeg, Frame, FrameSource};
use crate::config::VisionConfig;
use crate::debug::DebugSink;
use crate::error::VisionError;
use crate::models::{RemoteSegmenter, Segment, SegmentationModel};
use crate::processing::centroid::polygon_centroid;
use crate::processing::grid::GridMapper;
use crate::processing::overlay::render_overlay;
use agribot_core::{Centroid, GridCoordinate, GridDetector};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a successful cycle. `coordinates[k]` belongs to `centroids[k]`;
/// `segments` also holds instances whose polygon was too degenerate to yield
/// a centroid.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub coordinates: Vec<GridCoordinate>,
    pub centroids: Vec<Centroid>,
    pub segments: Vec<Segment>,
}

pub struct DetectionPipeline {
    source: Arc<dyn FrameSource>,
    model: Option<Arc<dyn SegmentationModel>>,
    mapper: GridMapper,
    debug: Arc<dyn DebugSink>,
    jpeg_quality: u8,
}

impl DetectionPipeline {
    pub fn new(
        source: Arc<dyn FrameSource>,
        model: Option<Arc<dyn SegmentationModel>>,
        mapper: GridMapper,
        debug: Arc<dyn DebugSink>,
        jpeg_quality: u8,
    ) -> Self {
        Self {
            source,
            model,
            mapper,
            debug,
            jpeg_quality,
        }
    }

    /// Build the pipeline described by `config`. Invalid geometry is a
    /// precondition violation.
    pub fn from_config(config: &VisionConfig, debug: Arc<dyn DebugSink>) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::PreconditionViolation)?;

        let mapper = GridMapper::new(config.image_size, config.grid_size)?;
        let source = camera::from_config(&config.capture, config.image_size)?;
        let model = match &config.inference {
            Some(inference) => Some(Arc::new(RemoteSegmenter::new(inference)?) as Arc<dyn SegmentationModel>),
            None => None,
        };

        Ok(Self::new(source, model, mapper, debug, config.jpeg_quality))
    }

    pub fn mapper(&self) -> &GridMapper {
        &self.mapper
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn describe_source(&self) -> String {
        self.source.describe()
    }

    /// Run one cycle and report why it produced nothing, if it did.
    pub async fn try_run_cycle(&self) -> Result<Detection, VisionError> {
        let frame = self.source.capture().await.ok_or_else(|| {
            VisionError::CaptureUnavailable(format!("no frame from {}", self.source.describe()))
        })?;

        let model = self.model.as_ref().ok_or_else(|| {
            VisionError::InferenceUnavailable("no segmentation model configured".to_string())
        })?;

        let segments = model.infer(&frame).await.map_err(|e| match e {
            VisionError::InferenceUnavailable(_) => e,
            other => VisionError::InferenceUnavailable(format!("{}: {}", model.name(), other)),
        })?;

        let centroids: Vec<Centroid> = segments
            .iter()
            .filter_map(|segment| polygon_centroid(&segment.polygon))
            .collect();
        if centroids.len() < segments.len() {
            debug!(
                "Skipped {} degenerate instance polygons",
                segments.len() - centroids.len()
            );
        }

        let coordinates = self.mapper.map(&centroids);
        self.spawn_debug_render(frame, segments.clone());

        Ok(Detection {
            coordinates,
            centroids,
            segments,
        })
    }

    /// Infallible form: any failure is logged and yields no targets.
    pub async fn run_cycle(&self) -> Vec<GridCoordinate> {
        match self.try_run_cycle().await {
            Ok(detection) => {
                debug!(
                    "Detected {} targets: {:?}",
                    detection.coordinates.len(),
                    detection.coordinates
                );
                detection.coordinates
            }
            Err(e) => {
                warn!("Detection cycle yielded no targets: {}", e);
                Vec::new()
            }
        }
    }

    /// Render, encode and persist on a blocking worker. The handle is
    /// dropped, so the cycle never waits on it.
    fn spawn_debug_render(&self, frame: Frame, segments: Vec<Segment>) {
        let sink = Arc::clone(&self.debug);
        let quality = self.jpeg_quality;
        tokio::task::spawn_blocking(move || {
            let overlay = render_overlay(frame.image(), &segments);
            let result = encode_jpeg(&overlay, quality).and_then(|jpeg| sink.persist(&jpeg));
            if let Err(e) = result {
                warn!("Failed to persist debug overlay: {}", e);
            }
        });
    }
}

#[async_trait]
impl GridDetector for DetectionPipeline {
    async fn detect(&self) -> Vec<GridCoordinate> {
        self.run_cycle().await
    }
}
