//! Error types for synapse-hub.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Sensor transport errors
    #[error("Sensor transport failed: {message}")]
    Transport { message: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    // Endpoint errors
    #[error("Failed to bind {endpoint} endpoint to {addr}: {message}")]
    Bind {
        endpoint: String,
        addr: String,
        message: String,
    },

    // Collaborator errors
    #[error("Phrase composition failed: {message}")]
    Composer { message: String },

    #[error("Speech synthesis tool not found: {tool}")]
    SynthesisToolNotFound { tool: String },

    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    #[error(
        "Transcription model not found at {path}. Download a ggml model there, or set audio.model = \"\" to disable transcription"
    )]
    TranscriptionModelNotFound { path: String },

    #[error("Transcription error: {message}")]
    Transcription { message: String },

    #[error("Telemetry broadcast failed: {message}")]
    Telemetry { message: String },

    // Audio payload errors
    #[error("Audio decode failed: {message}")]
    AudioDecode { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, HubError>;
