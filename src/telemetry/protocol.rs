//! JSON messages pushed to UI subscribers on the telemetry endpoint.

use serde::{Deserialize, Serialize};

/// Events sent by the hub to telemetry subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Greeting sent once when a subscriber connects
    Hello { version: String },
    /// A recognized gesture that went through the full pipeline pass
    Intent {
        label: String,
        /// Display string: speech followed by ` (BPM: <hr>)`
        message: String,
        speech: String,
        heart_rate: i32,
        speed: f32,
    },
}

impl TelemetryEvent {
    pub fn hello() -> Self {
        TelemetryEvent::Hello {
            version: crate::version_string(),
        }
    }

    /// Build an intent event, deriving the display message.
    pub fn intent(label: &str, speech: &str, heart_rate: i32, speed: f32) -> Self {
        TelemetryEvent::Intent {
            label: label.to_string(),
            message: format!("{} (BPM: {})", speech, heart_rate),
            speech: speech.to_string(),
            heart_rate,
            speed,
        }
    }

    /// Serialize event to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize event from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
