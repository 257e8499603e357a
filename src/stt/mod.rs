//! Speech-to-text for the audio-ingestion endpoint.

pub mod transcriber;
pub mod whisper;

pub use transcriber::{MockTranscriber, NullTranscriber, Transcriber};
pub use whisper::{WhisperConfig, WhisperTranscriber};
