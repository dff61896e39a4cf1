//! agribot-server: HTTP control surface for the agribot controller
//!
//! Wires the perception pipeline and the actuation loop together and
//! exposes them to the mobile control app over HTTP.

pub mod config;
pub mod http;
pub mod startup;

pub use config::{AgribotConfig, Cli, ServerConfig};
pub use http::{create_router, AppState};
pub use startup::{build, Agribot, StartupError};
