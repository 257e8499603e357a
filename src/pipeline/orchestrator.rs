//! Intent pipeline: decode, classify, gate, then run the collaborator chain.
//!
//! Frames are handled strictly one at a time. An admitted pass runs its steps
//! in a fixed order (context, compose, vocal mapping, speech, broadcast) and
//! the next frame is not looked at until the pass finishes. Blocking
//! collaborators run on the blocking pool but are still awaited inline.

use crate::audio::transcript::ContextProvider;
use crate::clock::{Clock, SystemClock};
use crate::collab::classifier::GestureClassifier;
use crate::collab::composer::PhraseComposer;
use crate::collab::speech::SpeechSynthesizer;
use crate::collab::vocal::VocalMapper;
use crate::config::Config;
use crate::error::{HubError, Result};
use crate::pipeline::error::{ErrorReporter, LogReporter, PassError, PassStage};
use crate::pipeline::gate::EventGate;
use crate::pipeline::types::{
    FrameOutcome, IntentEvent, PassReport, PipelineStats, RecognitionResult,
};
use crate::sensor::frame::{SensorSample, decode};
use crate::sensor::supervisor::FrameHandler;
use crate::telemetry::server::TelemetryBroadcaster;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Configuration for the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Minimum classifier similarity
    pub threshold: f32,
    /// Minimum time between two admitted gestures, across all labels
    pub cooldown: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: crate::defaults::MATCH_THRESHOLD,
            cooldown: crate::defaults::COOLDOWN,
        }
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            threshold: config.classifier.threshold,
            cooldown: config.gate.cooldown,
        }
    }
}

/// The downstream services a pass calls, in call order.
#[derive(Clone)]
pub struct Collaborators {
    pub classifier: Arc<dyn GestureClassifier>,
    pub context: Arc<dyn ContextProvider>,
    pub composer: Arc<dyn PhraseComposer>,
    pub vocal: Arc<dyn VocalMapper>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub telemetry: Arc<dyn TelemetryBroadcaster>,
}

pub struct IntentPipeline {
    config: PipelineConfig,
    collab: Collaborators,
    gate: EventGate,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn ErrorReporter>,
    stats: PipelineStats,
}

impl IntentPipeline {
    pub fn new(config: PipelineConfig, collab: Collaborators) -> Self {
        Self {
            gate: EventGate::new(config.cooldown),
            config,
            collab,
            clock: Arc::new(SystemClock),
            reporter: Arc::new(LogReporter),
            stats: PipelineStats::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Decode and process one raw frame. Malformed frames are dropped.
    pub async fn process_frame(&mut self, raw: &str) -> FrameOutcome {
        let outcome = match decode(raw) {
            Ok(sample) => self.process_sample(sample).await,
            Err(reason) => {
                warn!(frame = raw, "dropping malformed frame: {}", reason);
                FrameOutcome::Rejected(reason)
            }
        };
        self.stats.record(&outcome);
        outcome
    }

    async fn process_sample(&mut self, sample: SensorSample) -> FrameOutcome {
        let recognition = self.recognize(sample);
        let Some(label) = recognition.label else {
            trace!(%sample, "no gesture");
            return FrameOutcome::Unrecognized;
        };

        if !self.gate.admit(self.clock.now()) {
            debug!(label = %label, "cooling down, gesture dropped");
            return FrameOutcome::CooledDown { label };
        }

        info!(label = %label, heart_rate = sample.heart_rate, "gesture admitted");
        FrameOutcome::Admitted(self.run_pass(label, recognition.sample).await)
    }

    fn recognize(&self, sample: SensorSample) -> RecognitionResult {
        let label = self
            .collab
            .classifier
            .classify(&sample.vector(), self.config.threshold);
        RecognitionResult { label, sample }
    }

    /// Run the collaborator chain for one admitted gesture.
    ///
    /// A failed composition stops the pass; speech and broadcast failures are
    /// reported and the remaining steps still run.
    async fn run_pass(&self, label: String, sample: SensorSample) -> PassReport {
        let mut errors = Vec::new();

        let context = self.collab.context.latest_transcript();
        debug!(label = %label, context = %context, "composing phrase");

        let speech = match self.collab.composer.compose(&label, &context).await {
            Ok(speech) => speech,
            Err(e) => {
                let error = PassError::new(PassStage::Compose, e);
                self.reporter.report(&label, &error);
                errors.push(error);
                return PassReport {
                    label,
                    event: None,
                    errors,
                };
            }
        };

        let heart_rate = sample.heart_rate;
        let speed = self.collab.vocal.speed_for(heart_rate);
        info!(label = %label, speech = %speech, heart_rate, speed, "speaking");

        let event = IntentEvent {
            label,
            context,
            speech,
            heart_rate,
            speed,
        };

        if let Err(e) = self.speak(&event.speech, speed).await {
            let error = PassError::new(PassStage::Speak, e);
            self.reporter.report(&event.label, &error);
            errors.push(error);
        }

        match self.collab.telemetry.broadcast(&event.to_telemetry()) {
            Ok(subscribers) => debug!(subscribers, "intent broadcast"),
            Err(e) => {
                let error = PassError::new(PassStage::Broadcast, e);
                self.reporter.report(&event.label, &error);
                errors.push(error);
            }
        }

        PassReport {
            label: event.label.clone(),
            event: Some(event),
            errors,
        }
    }

    async fn speak(&self, text: &str, speed: f32) -> Result<()> {
        let speech = Arc::clone(&self.collab.speech);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || speech.speak(&text, speed))
            .await
            .map_err(|e| HubError::Synthesis {
                message: format!("Speech task failed: {}", e),
            })?
    }
}

#[async_trait::async_trait]
impl FrameHandler for IntentPipeline {
    async fn handle_frame(&mut self, raw: &str) {
        match self.process_frame(raw).await {
            FrameOutcome::Admitted(report) if report.is_clean() => {
                debug!(label = %report.label, "pass complete");
            }
            FrameOutcome::Admitted(report) => {
                debug!(
                    label = %report.label,
                    failures = report.errors.len(),
                    "pass finished with errors"
                );
            }
            FrameOutcome::Rejected(_)
            | FrameOutcome::Unrecognized
            | FrameOutcome::CooledDown { .. } => {}
        }
    }
}
