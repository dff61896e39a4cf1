//! Configuration for agribot-eye

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaptureConfig {
    /// No camera attached; every capture reports unavailable
    Disabled,
    /// Re-read a still image from disk on every capture
    File { path: PathBuf },
    /// GET a JPEG snapshot from an IP camera endpoint
    Snapshot {
        url: String,
        #[serde(default = "default_capture_timeout_ms")]
        timeout_ms: u64,
    },
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig::Disabled
    }
}

impl CaptureConfig {
    pub fn snapshot(url: impl Into<String>) -> Self {
        CaptureConfig::Snapshot {
            url: url.into(),
            timeout_ms: default_capture_timeout_ms(),
        }
    }
}

/// Remote segmentation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub url: String,
    #[serde(default = "default_inference_timeout_ms")]
    pub timeout_ms: u64,
}

impl InferenceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: default_inference_timeout_ms(),
        }
    }
}

/// Vision system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Side length in pixels of the square frame handed to the model
    pub image_size: u32,
    /// Number of grid cells per side
    pub grid_size: u32,
    /// Frame acquisition
    pub capture: CaptureConfig,
    /// Segmentation model; `None` leaves the pipeline without inference
    pub inference: Option<InferenceConfig>,
    /// Where the debug overlay of the latest cycle is written
    pub debug_output: PathBuf,
    /// JPEG quality of the debug overlay (1-100)
    pub jpeg_quality: u8,
}

fn default_capture_timeout_ms() -> u64 {
    3000
}

fn default_inference_timeout_ms() -> u64 {
    10_000
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            image_size: 640,
            grid_size: 8,
            capture: CaptureConfig::default(),
            inference: None,
            debug_output: PathBuf::from("output.jpg"),
            jpeg_quality: 85,
        }
    }
}

impl VisionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.grid_size == 0 {
            return Err("grid_size must be positive".to_string());
        }

        if self.image_size == 0 {
            return Err("image_size must be positive".to_string());
        }

        if self.grid_size > self.image_size {
            return Err(format!(
                "grid_size {} exceeds image_size {}",
                self.grid_size, self.image_size
            ));
        }

        if self.image_size > 8192 {
            return Err("image_size too large (max 8192)".to_string());
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        match &self.capture {
            CaptureConfig::Snapshot { url, timeout_ms } => {
                if url.is_empty() {
                    return Err("snapshot url must not be empty".to_string());
                }
                if *timeout_ms == 0 {
                    return Err("snapshot timeout must be greater than 0".to_string());
                }
            }
            CaptureConfig::File { path } => {
                if path.as_os_str().is_empty() {
                    return Err("capture file path must not be empty".to_string());
                }
            }
            CaptureConfig::Disabled => {}
        }

        if let Some(inference) = &self.inference {
            if inference.url.is_empty() {
                return Err("inference url must not be empty".to_string());
            }
            if inference.timeout_ms == 0 {
                return Err("inference timeout must be greater than 0".to_string());
            }
        }

        Ok(())
    }
}
