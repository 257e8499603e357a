//! Intent pipeline for decoded glove frames.
//!
//! One frame at a time: classify, pass the cooldown gate, then call the
//! downstream collaborators in a fixed order.

pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod types;

pub use error::{ErrorReporter, LogReporter, PassError, PassStage};
pub use gate::EventGate;
pub use orchestrator::{Collaborators, IntentPipeline, PipelineConfig};
pub use types::{FrameOutcome, IntentEvent, PassReport, PipelineStats, RecognitionResult};
