//! Error types for agribot-eye

use agribot_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("Inference unavailable: {0}")]
    InferenceUnavailable(String),

    #[error("Precondition violation: {0}")]
    PreconditionViolation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl From<VisionError> for CoreError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::PreconditionViolation(msg) => CoreError::PreconditionViolation(msg),
            VisionError::Config(msg) => CoreError::Configuration(msg),
            VisionError::Io(e) => CoreError::Io(e),
            other => CoreError::Configuration(format!("Vision error: {}", other)),
        }
    }
}

impl From<CoreError> for VisionError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::PreconditionViolation(msg) => VisionError::PreconditionViolation(msg),
            CoreError::Io(e) => VisionError::Io(e),
            other => VisionError::Config(other.to_string()),
        }
    }
}
