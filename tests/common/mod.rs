//! Shared fixtures for the hub integration tests: a scripted glove, a
//! telemetry client, and collaborators that record what they were asked.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use synapse_hub::collab::classifier::TemplateClassifier;
use synapse_hub::collab::vocal::HeartRateMapper;
use synapse_hub::config::Config;
use synapse_hub::hub::Services;
use synapse_hub::sensor::frame::VECTOR_LEN;
use synapse_hub::stt::transcriber::{NullTranscriber, Transcriber};
use synapse_hub::telemetry::protocol::TelemetryEvent;
use synapse_hub::{GestureClassifier, PhraseComposer, SpeechSynthesizer};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, accept_async, connect_async};

pub const WAIT: Duration = Duration::from_secs(5);

pub const OPEN_FRAME: &str = "<800,800,800,800,800,0.00,0.00,75>";
pub const FIST_FRAME: &str = "<300,300,300,300,300,0.00,0.00,60>";

/// Loopback config with a glove URL the caller chooses.
pub fn loopback_config(sensor_url: &str) -> Config {
    let mut config = Config::default();
    config.audio.bind = "127.0.0.1:0".to_string();
    config.telemetry.bind = "127.0.0.1:0".to_string();
    config.sensor.url = sensor_url.to_string();
    config.sensor.retry_interval = Duration::from_millis(20);
    config
}

/// A port on loopback with nothing listening on it.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Template classifier that counts how often it is consulted.
pub struct CountingClassifier {
    inner: TemplateClassifier,
    calls: AtomicUsize,
}

impl CountingClassifier {
    pub fn new(config: &Config) -> Self {
        Self {
            inner: TemplateClassifier::from_config(&config.classifier).unwrap(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GestureClassifier for CountingClassifier {
    fn classify(&self, vector: &[f32; VECTOR_LEN], threshold: f32) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.classify(vector, threshold)
    }
}

/// Composer that echoes label and context so tests can see both.
#[derive(Default)]
pub struct EchoComposer {
    pub seen: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl PhraseComposer for EchoComposer {
    async fn compose(&self, label: &str, context: &str) -> synapse_hub::Result<String> {
        self.seen
            .lock()
            .unwrap()
            .push((label.to_string(), context.to_string()));
        Ok(format!("{label} about {context}"))
    }
}

/// Synthesizer that records every utterance instead of playing it.
#[derive(Default)]
pub struct RecordingSpeech {
    pub spoken: Mutex<Vec<(String, f32)>>,
}

impl SpeechSynthesizer for RecordingSpeech {
    fn speak(&self, text: &str, speed: f32) -> synapse_hub::Result<()> {
        self.spoken.lock().unwrap().push((text.to_string(), speed));
        Ok(())
    }
}

pub struct Recorders {
    pub classifier: Arc<CountingClassifier>,
    pub composer: Arc<EchoComposer>,
    pub speech: Arc<RecordingSpeech>,
}

/// Offline services plus handles on the recording collaborators.
pub fn recording_services(config: &Config) -> (Services, Recorders) {
    recording_services_with(config, Arc::new(NullTranscriber))
}

pub fn recording_services_with(
    config: &Config,
    transcriber: Arc<dyn Transcriber>,
) -> (Services, Recorders) {
    let recorders = Recorders {
        classifier: Arc::new(CountingClassifier::new(config)),
        composer: Arc::new(EchoComposer::default()),
        speech: Arc::new(RecordingSpeech::default()),
    };
    let services = Services {
        classifier: recorders.classifier.clone(),
        composer: recorders.composer.clone(),
        vocal: Arc::new(HeartRateMapper::default()),
        speech: recorders.speech.clone(),
        transcriber,
    };
    (services, recorders)
}

/// Stand-in for the glove firmware: accepts hub connections and forwards
/// whatever the test pushes into `frames` as text messages.
pub struct FakeGlove {
    pub url: String,
    pub frames: mpsc::UnboundedSender<String>,
    pub task: JoinHandle<()>,
}

impl FakeGlove {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self::serve(listener)
    }

    /// Serve on a specific address, e.g. one the hub is already retrying.
    pub async fn start_on(addr: SocketAddr) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        Self::serve(listener)
    }

    fn serve(listener: TcpListener) -> Self {
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let (frames, mut rx) = mpsc::unbounded_channel::<String>();
        let task = tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(mut ws) = accept_async(stream).await else {
                return;
            };
            loop {
                tokio::select! {
                    frame = rx.recv() => match frame {
                        Some(frame) => {
                            if ws.send(Message::Text(frame)).await.is_err() {
                                return;
                            }
                        }
                        None => return,
                    },
                    inbound = ws.next() => match inbound {
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                        Some(Ok(_)) => {}
                    },
                }
            }
        });
        Self { url, frames, task }
    }

    pub fn send(&self, frame: &str) {
        self.frames.send(frame.to_string()).unwrap();
    }
}

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    ws
}

/// Next telemetry event, skipping pings.
pub async fn next_event(ws: &mut Client) -> TelemetryEvent {
    loop {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for telemetry")
            .expect("telemetry stream ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return TelemetryEvent::from_json(&text).unwrap();
        }
    }
}

/// Connect a telemetry subscriber and consume its hello.
pub async fn subscribe(addr: SocketAddr) -> Client {
    let mut ws = connect(addr).await;
    assert!(matches!(next_event(&mut ws).await, TelemetryEvent::Hello { .. }));
    ws
}

/// 100 ms of a 440 Hz tone as 16 kHz mono WAV bytes.
pub fn tone_wav() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..1600 {
            let t = i as f32 / 16000.0;
            let sample = (t * 440.0 * std::f32::consts::TAU).sin() * 8000.0;
            writer.write_sample(sample as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Poll `check` until it holds or `WAIT` elapses.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
