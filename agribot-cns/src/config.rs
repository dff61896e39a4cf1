//! Configuration for agribot-cns

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Remote actuator controller endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    /// Base URL; commands are posted to `<base_url>/cmd`
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://agribot.local:3001".to_string(),
            timeout_ms: 5000,
        }
    }
}

impl ActuatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!("Actuator base_url must be an http(s) URL, got '{}'", self.base_url));
        }

        if self.timeout_ms == 0 {
            return Err("Actuator timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Which actuator channel each step of the sequence writes to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMap {
    /// Drive motion; also carries the `auto`/`stop` directives
    pub motion: String,
    /// Target column
    pub target_x: String,
    /// Target row
    pub target_y: String,
    /// Actuation trigger
    pub trigger: String,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            motion: "0".to_string(),
            target_x: "3".to_string(),
            target_y: "4".to_string(),
            trigger: "5".to_string(),
        }
    }
}

impl ChannelMap {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let channels = [
            ("motion", &self.motion),
            ("target_x", &self.target_x),
            ("target_y", &self.target_y),
            ("trigger", &self.trigger),
        ];

        for (name, id) in &channels {
            if id.is_empty() {
                return Err(format!("Channel '{}' must not be empty", name));
            }
        }

        for (idx, (name, id)) in channels.iter().enumerate() {
            if let Some((other, _)) = channels[idx + 1..].iter().find(|(_, o)| o == id) {
                return Err(format!("Channels '{}' and '{}' share id '{}'", name, other, id));
            }
        }

        Ok(())
    }
}

/// Timing and fixed values of the autonomous sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Pause after each cycle, in milliseconds
    pub cycle_interval_ms: u64,
    /// Pause between positioning and trigger, in milliseconds
    pub settle_delay_ms: u64,
    /// Written to the motion channel at the top of every cycle
    pub reverse_value: Value,
    /// Written to the trigger channel once the target is positioned
    pub trigger_value: Value,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: 5000,
            settle_delay_ms: 2000,
            reverse_value: json!("reverse"),
            trigger_value: json!(1),
        }
    }
}

impl LoopConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.cycle_interval_ms == 0 {
            return Err("Cycle interval must be greater than 0".to_string());
        }

        if self.reverse_value.is_null() {
            return Err("Reverse value must not be null".to_string());
        }

        if self.trigger_value.is_null() {
            return Err("Trigger value must not be null".to_string());
        }

        Ok(())
    }
}
