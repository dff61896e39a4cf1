//! Process configuration: file, then `AGRIBOT_*` environment, then flags

use agribot_cns::{ActuatorConfig, ChannelMap, LoopConfig};
use agribot_core::config::read_document;
use agribot_core::ConfigError;
use agribot_eye::{CaptureConfig, InferenceConfig, VisionConfig};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Command-line flags. Every flag overrides the matching config entry.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "agribot-server", version, about = "Perception-driven actuation controller for a field robot")]
pub struct Cli {
    /// JSON or TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Base URL of the actuator controller
    #[arg(long)]
    pub actuator_url: Option<String>,

    /// Segmentation endpoint receiving JPEG frames
    #[arg(long)]
    pub inference_url: Option<String>,

    /// Read frames from this image file
    #[arg(long, conflicts_with = "snapshot_url")]
    pub frame_path: Option<PathBuf>,

    /// Fetch frames from this HTTP snapshot endpoint
    #[arg(long)]
    pub snapshot_url: Option<String>,

    /// Where the debug overlay is written
    #[arg(long)]
    pub debug_output: Option<PathBuf>,

    /// Log filter, e.g. `info` or `agribot_cns=debug`
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgribotConfig {
    pub server: ServerConfig,
    pub actuator: ActuatorConfig,
    pub autoloop: LoopConfig,
    pub channels: ChannelMap,
    pub vision: VisionConfig,
}

impl AgribotConfig {
    /// Build the effective configuration for this process and validate it.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => read_document(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay environment values; `lookup` maps a variable name to its value.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("AGRIBOT_HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("AGRIBOT_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!("Ignoring AGRIBOT_PORT={}: not a port number", port),
            }
        }

        if let Some(url) = lookup("AGRIBOT_ACTUATOR_URL") {
            self.actuator.base_url = url;
        }

        if let Some(url) = lookup("AGRIBOT_INFERENCE_URL") {
            self.set_inference_url(url);
        }

        if let Some(path) = lookup("AGRIBOT_FRAME_PATH") {
            self.vision.capture = CaptureConfig::File { path: PathBuf::from(path) };
        }

        if let Some(url) = lookup("AGRIBOT_SNAPSHOT_URL") {
            self.vision.capture = CaptureConfig::snapshot(url);
        }

        if let Some(path) = lookup("AGRIBOT_DEBUG_OUTPUT") {
            self.vision.debug_output = PathBuf::from(path);
        }
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(url) = &cli.actuator_url {
            self.actuator.base_url = url.clone();
        }
        if let Some(url) = &cli.inference_url {
            self.set_inference_url(url.clone());
        }
        if let Some(path) = &cli.frame_path {
            self.vision.capture = CaptureConfig::File { path: path.clone() };
        }
        if let Some(url) = &cli.snapshot_url {
            self.vision.capture = CaptureConfig::snapshot(url.clone());
        }
        if let Some(path) = &cli.debug_output {
            self.vision.debug_output = path.clone();
        }
    }

    fn set_inference_url(&mut self, url: String) {
        match &mut self.vision.inference {
            Some(inference) => inference.url = url,
            None => self.vision.inference = Some(InferenceConfig::new(url)),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.is_empty() {
            return Err(ConfigError::ValidationError("server.host must not be empty".to_string()));
        }

        let sections = [
            ("actuator", self.actuator.validate()),
            ("autoloop", self.autoloop.validate()),
            ("channels", self.channels.validate()),
            ("vision", self.vision.validate()),
        ];
        for (section, result) in sections {
            if let Err(msg) = result {
                return Err(ConfigError::ValidationError(format!("{}: {}", section, msg)));
            }
        }

        Ok(())
    }
}
