//! Frame acquisition
//!
//! The camera driver itself lives outside this crate. Sources here pull a
//! frame from something the driver already exposes (a file it keeps
//! overwriting, or an HTTP snapshot endpoint) and square-resize it to the
//! model input size.

use crate::config::CaptureConfig;
use crate::error::VisionError;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// One captured frame, already resized to `image_size × image_size`.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Square-resize an arbitrary decoded image.
    pub fn from_dynamic(image: DynamicImage, size: u32) -> Self {
        let resized = if image.width() == size && image.height() == size {
            image.to_rgb8()
        } else {
            image.resize_exact(size, size, FilterType::Triangle).to_rgb8()
        };
        Self { image: resized }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, VisionError> {
        encode_jpeg(&self.image, quality)
    }
}

pub(crate) fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, VisionError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode_image(image)?;
    Ok(buffer)
}

/// Anything that can hand over the current view of the camera.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// `None` when the device is unavailable; the reason is logged by the source.
    async fn capture(&self) -> Option<Frame>;

    fn describe(&self) -> String;
}

/// Build the configured source.
pub fn from_config(config: &CaptureConfig, image_size: u32) -> Result<Arc<dyn FrameSource>, VisionError> {
    let source: Arc<dyn FrameSource> = match config {
        CaptureConfig::Disabled => Arc::new(DisabledSource),
        CaptureConfig::File { path } => Arc::new(StillImageSource::new(path.clone(), image_size)),
        CaptureConfig::Snapshot { url, timeout_ms } => Arc::new(SnapshotSource::new(
            url.clone(),
            Duration::from_millis(*timeout_ms),
            image_size,
        )?),
    };
    Ok(source)
}

/// No camera attached.
pub struct DisabledSource;

#[async_trait]
impl FrameSource for DisabledSource {
    async fn capture(&self) -> Option<Frame> {
        debug!("Capture requested but no camera is configured");
        None
    }

    fn describe(&self) -> String {
        "disabled".to_string()
    }
}

/// Reads a still image from disk on every capture.
pub struct StillImageSource {
    path: PathBuf,
    size: u32,
}

impl StillImageSource {
    pub fn new(path: PathBuf, size: u32) -> Self {
        Self { path, size }
    }
}

#[async_trait]
impl FrameSource for StillImageSource {
    async fn capture(&self) -> Option<Frame> {
        let path = self.path.clone();
        let size = self.size;
        let result = tokio::task::spawn_blocking(move || {
            image::open(&path).map(|img| Frame::from_dynamic(img, size))
        })
        .await;

        match result {
            Ok(Ok(frame)) => Some(frame),
            Ok(Err(e)) => {
                warn!("Failed to read frame from {}: {}", self.path.display(), e);
                None
            }
            Err(e) => {
                warn!("Frame decode task failed: {}", e);
                None
            }
        }
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Pulls a JPEG snapshot from an IP camera over HTTP.
pub struct SnapshotSource {
    client: reqwest::Client,
    url: String,
    size: u32,
}

impl SnapshotSource {
    pub fn new(url: String, timeout: Duration, size: u32) -> Result<Self, VisionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VisionError::Config(format!("Failed to build snapshot client: {}", e)))?;
        Ok(Self { client, url, size })
    }

    async fn fetch(&self) -> Result<Frame, VisionError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| VisionError::CaptureUnavailable(format!("snapshot request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VisionError::CaptureUnavailable(format!(
                "snapshot endpoint returned {}",
                status.as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VisionError::CaptureUnavailable(format!("snapshot body: {}", e)))?;

        let size = self.size;
        tokio::task::spawn_blocking(move || {
            image::load_from_memory(&bytes)
                .map(|img| Frame::from_dynamic(img, size))
                .map_err(VisionError::from)
        })
        .await
        .map_err(|e| VisionError::CaptureUnavailable(format!("decode task failed: {}", e)))?
    }
}

#[async_trait]
impl FrameSource for SnapshotSource {
    async fn capture(&self) -> Option<Frame> {
        match self.fetch().await {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Snapshot capture from {} failed: {}", self.url, e);
                None
            }
        }
    }

    fn describe(&self) -> String {
        format!("snapshot:{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_frame_from_dynamic_resizes_to_square() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(530, 300, Rgb([10, 20, 30])));
        let frame = Frame::from_dynamic(img, 640);
        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 640);
    }

    #[test]
    fn test_frame_to_jpeg_has_magic() {
        let frame = Frame::new(RgbImage::from_pixel(16, 16, Rgb([200, 0, 0])));
        let jpeg = frame.to_jpeg(80).unwrap();
        assert!(jpeg.len() > 4);
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_disabled_source() {
        let source = DisabledSource;
        assert!(tokio_test::block_on(source.capture()).is_none());
        assert_eq!(source.describe(), "disabled");
    }

    #[tokio::test]
    async fn test_still_image_source_missing_file() {
        let source = StillImageSource::new(PathBuf::from("/nonexistent/frame.jpg"), 640);
        assert!(source.capture().await.is_none());
    }

    #[tokio::test]
    async fn test_still_image_source_reads_and_resizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        RgbImage::from_pixel(100, 50, Rgb([0, 255, 0])).save(&path).unwrap();

        let source = StillImageSource::new(path, 64);
        let frame = source.capture().await.expect("frame");
        assert_eq!((frame.width(), frame.height()), (64, 64));
    }
}
