//! Segmentation model served over HTTP

use crate::camera::Frame;
use crate::config::InferenceConfig;
use crate::error::VisionError;
use crate::models::segment::{Segment, SegmentationModel};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const FRAME_JPEG_QUALITY: u8 = 90;
const MAX_SEGMENTS: usize = 256;

#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Bare(Vec<Segment>),
    Wrapped { segments: Vec<Segment> },
}

/// Posts each frame as `image/jpeg` to an inference endpoint that answers
/// with the instance polygons found in it.
pub struct RemoteSegmenter {
    client: reqwest::Client,
    url: String,
}

impl RemoteSegmenter {
    pub fn new(config: &InferenceConfig) -> Result<Self, VisionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| VisionError::Config(format!("Failed to build inference client: {}", e)))?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl SegmentationModel for RemoteSegmenter {
    async fn infer(&self, frame: &Frame) -> Result<Vec<Segment>, VisionError> {
        let image = frame.image().clone();
        let jpeg = tokio::task::spawn_blocking(move || crate::camera::encode_jpeg(&image, FRAME_JPEG_QUALITY))
            .await
            .map_err(|e| VisionError::InferenceUnavailable(format!("encode task failed: {}", e)))??;

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(jpeg)
            .send()
            .await
            .map_err(|e| VisionError::InferenceUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VisionError::InferenceUnavailable(format!(
                "inference endpoint returned {}",
                status.as_u16()
            )));
        }

        let parsed: InferenceResponse = response
            .json()
            .await
            .map_err(|e| VisionError::InferenceUnavailable(format!("malformed response: {}", e)))?;

        let mut segments = match parsed {
            InferenceResponse::Bare(segments) => segments,
            InferenceResponse::Wrapped { segments } => segments,
        };
        if segments.len() > MAX_SEGMENTS {
            warn!(
                "Remote model returned {} segments, keeping the first {}",
                segments.len(),
                MAX_SEGMENTS
            );
            segments.truncate(MAX_SEGMENTS);
        }
        debug!("Remote model returned {} segments", segments.len());
        Ok(segments)
    }

    fn name(&self) -> &str {
        &self.url
    }
}
