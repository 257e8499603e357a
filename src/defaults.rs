//! Default configuration constants for synapse-hub.
//!
//! Shared by the config types, the CLI and the tests so the baseline
//! behavior is defined in one place.

use std::time::Duration;

/// Default sensor source (the glove firmware's WebSocket server).
pub const SENSOR_URL: &str = "ws://localhost:81";

/// Constant interval between reconnection attempts to the sensor source.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Upper bound on TCP connect plus WebSocket handshake with the glove.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Keepalive ping period on a quiet sensor link.
pub const PING_INTERVAL: Duration = Duration::from_secs(20);

/// How long a pinged glove may stay silent before the link is dropped.
pub const PING_TIMEOUT: Duration = Duration::from_secs(20);

/// Pause after a failed `accept` before listening again.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Minimum time between two admitted intents, across all labels.
pub const COOLDOWN: Duration = Duration::from_secs(1);

/// Cosine-similarity threshold for a gesture template match.
pub const MATCH_THRESHOLD: f32 = 0.92;

/// Audio-ingestion WebSocket bind address.
pub const AUDIO_BIND: &str = "0.0.0.0:8765";

/// Telemetry WebSocket bind address.
pub const TELEMETRY_BIND: &str = "0.0.0.0:82";

/// Events buffered per telemetry subscriber before it starts lagging.
pub const TELEMETRY_BUFFER: usize = 64;

/// Context returned until the first transcript arrives.
pub const DEFAULT_CONTEXT: &str = "The teacher is explaining photosynthesis.";

/// Sample rate expected by the transcriber (16kHz mono PCM).
pub const SAMPLE_RATE: u32 = 16000;

/// Whisper model loaded for classroom transcription.
///
/// A bare name resolves to `ggml-<name>.bin` in the models directory.
pub const DEFAULT_MODEL: &str = "tiny.en";

/// Default transcription language.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Local Ollama endpoint used by the phrase composer.
pub const OLLAMA_URL: &str = "http://localhost:11434";

/// Model asked to expand gesture shorthand into a sentence.
pub const OLLAMA_MODEL: &str = "llama3";

/// Upper bound on a single composer request.
pub const COMPOSER_TIMEOUT: Duration = Duration::from_secs(10);

/// Text-to-speech program invoked by the command synthesizer.
pub const SPEECH_COMMAND: &str = "espeak-ng";

/// Speaking rate (words per minute) at a speed multiplier of 1.0.
pub const SPEECH_BASE_WPM: u32 = 175;

/// Heart rate at which the voice speaks at its base speed.
pub const RESTING_BPM: i32 = 75;

/// Speed change per BPM above or below resting.
pub const BPM_SENSITIVITY: f32 = 0.01;

/// Slowest allowed speech multiplier.
pub const MIN_SPEED: f32 = 0.75;

/// Fastest allowed speech multiplier.
pub const MAX_SPEED: f32 = 1.5;

/// Midpoint of the flex sensor range (open ~800, closed ~300).
pub const FLEX_CENTER: f32 = 550.0;

/// Half-width of the flex sensor range.
pub const FLEX_SPAN: f32 = 250.0;

/// Gyro reading (deg/s) that normalizes to 1.0.
pub const GYRO_SPAN: f32 = 250.0;
