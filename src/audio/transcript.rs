//! Most-recent-transcript slot shared between audio ingestion and the
//! intent pipeline.

use std::sync::{Arc, RwLock};

/// Supplies conversational context for phrase composition.
pub trait ContextProvider: Send + Sync {
    /// Latest transcript, or a default placeholder before any has arrived.
    fn latest_transcript(&self) -> String;
}

/// Single-writer, many-reader cell holding the latest transcript.
///
/// The audio endpoint replaces the value; the pipeline only reads it.
/// Clones share the same cell.
#[derive(Debug, Clone)]
pub struct TranscriptSlot {
    latest: Arc<RwLock<Option<String>>>,
    default_context: Arc<str>,
}

impl TranscriptSlot {
    pub fn new(default_context: impl Into<String>) -> Self {
        Self {
            latest: Arc::new(RwLock::new(None)),
            default_context: Arc::from(default_context.into()),
        }
    }

    /// Replace the stored transcript. Blank text is ignored so that silent
    /// audio never wipes out useful context. Returns whether the slot changed.
    pub fn replace(&self, transcript: &str) -> bool {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return false;
        }
        let mut latest = self.latest.write().unwrap_or_else(|e| e.into_inner());
        *latest = Some(transcript.to_string());
        true
    }

    /// The stored transcript, if any has been written.
    pub fn get(&self) -> Option<String> {
        self.latest
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ContextProvider for TranscriptSlot {
    fn latest_transcript(&self) -> String {
        self.get()
            .unwrap_or_else(|| self.default_context.to_string())
    }
}
