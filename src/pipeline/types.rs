//! Data types for one pass through the intent pipeline.

use crate::pipeline::error::PassError;
use crate::sensor::frame::{FrameError, SensorSample};
use crate::telemetry::protocol::TelemetryEvent;

/// Classifier verdict for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    /// `None` when no gesture matched.
    pub label: Option<String>,
    pub sample: SensorSample,
}

/// Everything one admitted gesture produced, assembled step by step.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentEvent {
    pub label: String,
    /// Transcript read at admission time.
    pub context: String,
    pub speech: String,
    pub heart_rate: i32,
    /// Speed multiplier derived from `heart_rate`.
    pub speed: f32,
}

impl IntentEvent {
    pub fn to_telemetry(&self) -> TelemetryEvent {
        TelemetryEvent::intent(&self.label, &self.speech, self.heart_rate, self.speed)
    }
}

/// Result of an admitted pass.
#[derive(Debug)]
pub struct PassReport {
    pub label: String,
    /// `None` if composition failed and the pass stopped early.
    pub event: Option<IntentEvent>,
    pub errors: Vec<PassError>,
}

impl PassReport {
    /// True when every step succeeded.
    pub fn is_clean(&self) -> bool {
        self.event.is_some() && self.errors.is_empty()
    }
}

/// What happened to one raw frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// Malformed payload, dropped.
    Rejected(FrameError),
    /// Decoded, but the classifier found no gesture.
    Unrecognized,
    /// Recognized during the cooldown window, dropped.
    CooledDown { label: String },
    Admitted(PassReport),
}

/// Running counters kept by the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames: u64,
    pub rejected: u64,
    pub unrecognized: u64,
    pub cooled_down: u64,
    pub admitted: u64,
    /// Admitted passes where at least one step failed.
    pub failed_passes: u64,
}

impl PipelineStats {
    pub fn record(&mut self, outcome: &FrameOutcome) {
        self.frames += 1;
        match outcome {
            FrameOutcome::Rejected(_) => self.rejected += 1,
            FrameOutcome::Unrecognized => self.unrecognized += 1,
            FrameOutcome::CooledDown { .. } => self.cooled_down += 1,
            FrameOutcome::Admitted(report) => {
                self.admitted += 1;
                if !report.is_clean() {
                    self.failed_passes += 1;
                }
            }
        }
    }
}
