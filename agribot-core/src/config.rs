// Configuration document loading shared by every agribot crate

use serde::de::DeserializeOwned;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ValidationError(msg) => crate::Error::PreconditionViolation(msg),
            other => crate::Error::Configuration(other.to_string()),
        }
    }
}

/// Parse a configuration document, accepting JSON or TOML.
pub fn parse_document<T: DeserializeOwned>(content: &str) -> Result<T, ConfigError> {
    // JSON first: a JSON object is never valid TOML, so the order only
    // decides which error is reported.
    let json_err = match serde_json::from_str::<T>(content) {
        Ok(config) => return Ok(config),
        Err(e) => e,
    };

    match toml::from_str::<T>(content) {
        Ok(config) => Ok(config),
        Err(toml_err) => {
            if content.trim_start().starts_with('{') {
                Err(ConfigError::ParseError(format!("invalid JSON: {}", json_err)))
            } else {
                Err(ConfigError::ParseError(format!("invalid TOML: {}", toml_err)))
            }
        }
    }
}

/// Read and parse a configuration file.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
    parse_document(&content)
}
