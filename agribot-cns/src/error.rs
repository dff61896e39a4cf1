//! Error types for agribot-cns

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CnsError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<agribot_core::Error> for CnsError {
    fn from(err: agribot_core::Error) -> Self {
        match err {
            agribot_core::Error::PreconditionViolation(msg) => CnsError::Validation(msg),
            other => CnsError::Config(format!("Core error: {}", other)),
        }
    }
}

impl From<CnsError> for agribot_core::Error {
    fn from(err: CnsError) -> Self {
        match err {
            CnsError::Validation(msg) => agribot_core::Error::PreconditionViolation(msg),
            other => agribot_core::Error::Configuration(other.to_string()),
        }
    }
}
