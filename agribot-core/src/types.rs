//! Data model shared by the perception and actuation crates

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Area-weighted center of a detected object, in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
}

impl Centroid {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Discrete actuator-grid cell. Serialized as a two-element array `[i, j]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct GridCoordinate {
    pub i: u32,
    pub j: u32,
}

impl GridCoordinate {
    pub fn new(i: u32, j: u32) -> Self {
        Self { i, j }
    }
}

impl From<[u32; 2]> for GridCoordinate {
    fn from([i, j]: [u32; 2]) -> Self {
        Self { i, j }
    }
}

impl From<GridCoordinate> for [u32; 2] {
    fn from(coord: GridCoordinate) -> Self {
        [coord.i, coord.j]
    }
}

impl fmt::Display for GridCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.i, self.j)
    }
}

/// One instruction for the remote actuator controller: a channel id and the
/// value written to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub channel: String,
    pub value: Value,
}

impl Command {
    pub fn new(channel: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            channel: channel.into(),
            value: value.into(),
        }
    }

    /// Wire form: a single-key object `{"<channel>": <value>}`.
    pub fn to_payload(&self) -> Value {
        let mut map = Map::with_capacity(1);
        map.insert(self.channel.clone(), self.value.clone());
        Value::Object(map)
    }

    /// Recover a command from a single-key object, if the payload is one.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let object = payload.as_object()?;
        if object.len() != 1 {
            return None;
        }
        let (channel, value) = object.iter().next()?;
        Some(Self::new(channel.clone(), value.clone()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.channel, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grid_coordinate_serializes_as_pair() {
        let coords = vec![GridCoordinate::new(3, 4), GridCoordinate::new(0, 7)];
        let encoded = serde_json::to_value(&coords).unwrap();
        assert_eq!(encoded, json!([[3, 4], [0, 7]]));

        let decoded: Vec<GridCoordinate> = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, coords);
    }

    #[test]
    fn test_command_payload() {
        let cmd = Command::new("0", "reverse");
        assert_eq!(cmd.to_payload(), json!({"0": "reverse"}));

        let trigger = Command::new("5", 1);
        assert_eq!(trigger.to_payload(), json!({"5": 1}));
    }

    #[test]
    fn test_command_from_payload() {
        let cmd = Command::from_payload(&json!({"3": 6})).unwrap();
        assert_eq!(cmd.channel, "3");
        assert_eq!(cmd.value, json!(6));

        assert!(Command::from_payload(&json!({"3": 6, "4": 2})).is_none());
        assert!(Command::from_payload(&json!("stop")).is_none());
    }
}
