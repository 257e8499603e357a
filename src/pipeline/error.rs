//! Error reporting for failed pipeline steps.

use crate::error::HubError;
use std::fmt;
use thiserror::Error;

/// Fallible step of an admitted pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStage {
    Compose,
    Speak,
    Broadcast,
}

impl fmt::Display for PassStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PassStage::Compose => "compose",
            PassStage::Speak => "speak",
            PassStage::Broadcast => "broadcast",
        };
        f.write_str(name)
    }
}

/// A collaborator failure inside one pass. Never fatal to ingestion.
#[derive(Debug, Error)]
#[error("{stage} step failed: {error}")]
pub struct PassError {
    pub stage: PassStage,
    #[source]
    pub error: HubError,
}

impl PassError {
    pub fn new(stage: PassStage, error: HubError) -> Self {
        Self { stage, error }
    }
}

/// Trait for reporting pass errors.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, label: &str, error: &PassError);
}

/// Reporter that logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, label: &str, error: &PassError) {
        tracing::warn!(label, stage = %error.stage, "{}", error);
    }
}
