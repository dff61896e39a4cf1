pub mod types;
pub mod error;
pub mod config;
pub mod detector;

pub use error::{Error, Result};
pub use types::{Centroid, GridCoordinate, Command};
pub use config::ConfigError;
pub use detector::GridDetector;
