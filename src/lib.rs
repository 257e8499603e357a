//! synapse-hub - gesture-to-speech hub for a wearable sensor glove
//!
//! Reads glove frames over WebSocket, recognizes gestures, composes a
//! sentence with classroom context, speaks it at a heart-rate-driven pace,
//! and mirrors every recognized intent to UI subscribers.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod cli;
pub mod clock;
pub mod collab;
pub mod config;
pub mod defaults;
pub mod error;
pub mod hub;
pub mod net;
pub mod pipeline;
pub mod sensor;
pub mod stt;
pub mod telemetry;

// Composition root
pub use hub::{Hub, HubReport, Services};

// Collaborator traits (classify → context → compose → map → speak → broadcast)
pub use audio::transcript::{ContextProvider, TranscriptSlot};
pub use collab::{GestureClassifier, PhraseComposer, SpeechSynthesizer, VocalMapper};
pub use stt::transcriber::Transcriber;
pub use telemetry::server::TelemetryBroadcaster;

// Pipeline
pub use pipeline::{Collaborators, EventGate, FrameOutcome, IntentPipeline, PipelineConfig};
pub use sensor::{ConnectionState, ConnectionSupervisor, FrameHandler, SensorSample};

// Error handling
pub use error::{HubError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
