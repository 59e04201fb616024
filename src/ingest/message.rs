use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IngestError;

pub const UNKNOWN_SOURCE: &str = "unknown";

/// One steering sample as sent by an input client:
/// `{"source": "phone", "steering": 0.4, "timestamp": 1700000000.25}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteeringMessage {
    pub source: String,
    pub steering: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl SteeringMessage {
    pub fn new(source: impl Into<String>, steering: f64) -> Self {
        Self {
            source: source.into(),
            steering,
            timestamp: None,
        }
    }

    /// Parse a text frame. The value is not clamped here; that happens in
    /// the registry.
    pub fn parse(text: &str) -> Result<Self, IngestError> {
        let value: Value = serde_json::from_str(text)?;
        let object = value.as_object().ok_or(IngestError::NotAnObject)?;

        let source = match object.get("source").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => UNKNOWN_SOURCE.to_string(),
        };

        let steering = match object.get("steering") {
            None | Some(Value::Null) => return Err(IngestError::MissingSteering),
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| IngestError::NonNumericSteering(n.to_string()))?,
            Some(other) => return Err(IngestError::NonNumericSteering(other.to_string())),
        };

        if !steering.is_finite() {
            return Err(IngestError::NonFiniteSteering(steering));
        }

        let timestamp = object
            .get("timestamp")
            .and_then(Value::as_f64)
            .filter(|t| t.is_finite());

        Ok(Self {
            source,
            steering,
            timestamp,
        })
    }
}

/// Frame pushed to game clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameUpdateMessage {
    pub steering: f64,
    pub timestamp: DateTime<Utc>,
}

impl GameUpdateMessage {
    pub fn now(steering: f64) -> Self {
        Self {
            steering,
            timestamp: Utc::now(),
        }
    }
}

/// First `max_chars` characters of a raw payload, for log lines.
pub fn preview(raw: &str, max_chars: usize) -> String {
    raw.chars().take(max_chars).collect()
}
