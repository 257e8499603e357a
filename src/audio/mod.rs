//! Audio ingestion: WAV decoding, the WebSocket endpoint, and the shared
//! transcript that feeds phrase composition.

pub mod server;
pub mod transcript;
pub mod wav;

pub use server::{AudioIngest, AudioServer};
pub use transcript::{ContextProvider, TranscriptSlot};
