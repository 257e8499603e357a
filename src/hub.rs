//! Composition root: wires collaborators together and runs the audio
//! endpoint, the telemetry endpoint and the sensor supervisor side by side
//! until shutdown.

use crate::audio::server::{AudioIngest, AudioServer};
use crate::audio::transcript::TranscriptSlot;
use crate::collab::classifier::{GestureClassifier, TemplateClassifier};
use crate::collab::composer::{self, PhraseComposer};
use crate::collab::speech::{self, SpeechSynthesizer};
use crate::collab::vocal::{HeartRateMapper, VocalMapper};
use crate::config::Config;
use crate::error::{HubError, Result};
use crate::pipeline::orchestrator::{Collaborators, IntentPipeline, PipelineConfig};
use crate::pipeline::types::PipelineStats;
use crate::sensor::supervisor::{ConnectionState, ConnectionSupervisor};
use crate::stt::transcriber::Transcriber;
use crate::stt::whisper;
use crate::telemetry::server::{TelemetryHub, TelemetryServer};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Collaborators that are chosen by configuration rather than owned by the hub.
#[derive(Clone)]
pub struct Services {
    pub classifier: Arc<dyn GestureClassifier>,
    pub composer: Arc<dyn PhraseComposer>,
    pub vocal: Arc<dyn VocalMapper>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub transcriber: Arc<dyn Transcriber>,
}

impl Services {
    /// Build the production collaborators.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            classifier: Arc::new(TemplateClassifier::from_config(&config.classifier)?),
            composer: composer::from_config(&config.composer)?,
            vocal: Arc::new(HeartRateMapper::default()),
            speech: speech::from_config(&config.speech),
            transcriber: whisper::from_config(&config.audio)?,
        })
    }
}

/// Summary returned once the hub has shut down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubReport {
    pub pipeline: PipelineStats,
}

/// A hub with both endpoints bound, ready to run.
pub struct Hub {
    audio: AudioServer,
    telemetry: TelemetryServer,
    supervisor: ConnectionSupervisor,
    pipeline: IntentPipeline,
    transcript: TranscriptSlot,
    telemetry_hub: TelemetryHub,
    cancel: CancellationToken,
}

impl Hub {
    /// Validate configuration, build production collaborators, and bind.
    pub async fn bind(config: Config) -> Result<Self> {
        config.validate()?;
        let services = Services::from_config(&config)?;
        Self::bind_with(config, services).await
    }

    /// Bind both endpoints using the given collaborators.
    ///
    /// Bind failures are returned; the hub cannot run without its endpoints.
    pub async fn bind_with(config: Config, services: Services) -> Result<Self> {
        let transcript = TranscriptSlot::new(config.audio.default_context.clone());
        let telemetry_hub = TelemetryHub::new(config.telemetry.buffer);

        let audio = AudioServer::bind(
            &config.audio.bind,
            AudioIngest::new(services.transcriber, transcript.clone()),
        )
        .await?;
        let telemetry = TelemetryServer::bind(&config.telemetry.bind, telemetry_hub.clone()).await?;

        let collab = Collaborators {
            classifier: services.classifier,
            context: Arc::new(transcript.clone()),
            composer: services.composer,
            vocal: services.vocal,
            speech: services.speech,
            telemetry: Arc::new(telemetry_hub.clone()),
        };
        let pipeline = IntentPipeline::new(PipelineConfig::from(&config), collab);
        let supervisor = ConnectionSupervisor::from_config(&config.sensor);

        Ok(Self {
            audio,
            telemetry,
            supervisor,
            pipeline,
            transcript,
            telemetry_hub,
            cancel: CancellationToken::new(),
        })
    }

    pub fn audio_addr(&self) -> Result<SocketAddr> {
        self.audio.local_addr()
    }

    pub fn telemetry_addr(&self) -> Result<SocketAddr> {
        self.telemetry.local_addr()
    }

    pub fn sensor_state(&self) -> watch::Receiver<ConnectionState> {
        self.supervisor.state()
    }

    pub fn transcript(&self) -> TranscriptSlot {
        self.transcript.clone()
    }

    pub fn telemetry_hub(&self) -> TelemetryHub {
        self.telemetry_hub.clone()
    }

    /// Token that stops the hub when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<HubReport> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` completes or the cancel token fires.
    pub async fn run_until<F>(self, shutdown: F) -> Result<HubReport>
    where
        F: Future<Output = ()>,
    {
        let Hub {
            audio,
            telemetry,
            supervisor,
            mut pipeline,
            cancel,
            ..
        } = self;

        info!(sensor = supervisor.url(), "hub online");

        let audio_task = tokio::spawn(audio.run(cancel.clone()));
        let telemetry_task = tokio::spawn(telemetry.run(cancel.clone()));
        let sensor_cancel = cancel.clone();
        let sensor_task = tokio::spawn(async move {
            supervisor.run(&mut pipeline, sensor_cancel).await;
            pipeline.stats()
        });

        tokio::select! {
            _ = shutdown => info!("shutdown requested"),
            _ = cancel.cancelled() => {}
        }
        cancel.cancel();

        log_endpoint_exit("audio", audio_task).await;
        log_endpoint_exit("telemetry", telemetry_task).await;
        let stats = sensor_task.await.map_err(|e| {
            HubError::Other(format!("sensor task failed: {}", e))
        })?;

        info!(
            frames = stats.frames,
            admitted = stats.admitted,
            rejected = stats.rejected,
            "hub stopped"
        );
        Ok(HubReport { pipeline: stats })
    }
}

async fn log_endpoint_exit(name: &str, task: JoinHandle<Result<()>>) {
    match task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(endpoint = name, "endpoint failed: {}", e),
        Err(e) => error!(endpoint = name, "endpoint task panicked: {}", e),
    }
}

/// Resolve on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                error!("Failed to listen for SIGINT: {}", e);
                std::future::pending::<()>().await;
            }
        }
        _ = wait_for_sigterm() => {}
    }
}

/// Wait for SIGTERM signal (used by systemd).
#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Failed to register SIGTERM handler: {}", e);
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}
