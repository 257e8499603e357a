//! Outbound connection to the glove's WebSocket server.
//!
//! The supervisor connects, reads frames in arrival order, and hands each one
//! to a `FrameHandler`, awaiting it before reading the next. On any transport
//! failure it drops back to `Disconnected`, waits a fixed interval, and
//! tries again until cancelled. A glove that stops answering (lost power,
//! dropped off WiFi) is caught by the handshake timeout and the keepalive
//! deadline, since no FIN ever arrives.

use crate::config::SensorConfig;
use crate::defaults;
use crate::error::{HubError, Result};
use futures_util::{SinkExt, StreamExt};
use std::fmt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Consumer of raw sensor frames.
#[async_trait::async_trait]
pub trait FrameHandler: Send {
    /// Process one raw frame. The next frame is not read until this returns.
    async fn handle_frame(&mut self, raw: &str);
}

type SensorStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Deadlines that detect a half-open sensor link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveness {
    /// Bound on TCP connect plus WebSocket handshake.
    pub connect_timeout: Duration,
    /// Ping period while connected.
    pub ping_interval: Duration,
    /// Extra silence tolerated after a ping before the link is dropped.
    pub ping_timeout: Duration,
}

impl Default for Liveness {
    fn default() -> Self {
        Self {
            connect_timeout: defaults::CONNECT_TIMEOUT,
            ping_interval: defaults::PING_INTERVAL,
            ping_timeout: defaults::PING_TIMEOUT,
        }
    }
}

impl Liveness {
    /// Longest silence accepted from a connected glove.
    pub fn silence_limit(&self) -> Duration {
        self.ping_interval + self.ping_timeout
    }
}

pub struct ConnectionSupervisor {
    url: String,
    retry_interval: Duration,
    liveness: Liveness,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionSupervisor {
    pub fn new(url: impl Into<String>, retry_interval: Duration) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            url: url.into(),
            retry_interval,
            liveness: Liveness::default(),
            state_tx,
        }
    }

    pub fn from_config(config: &SensorConfig) -> Self {
        Self::new(config.url.clone(), config.retry_interval).with_liveness(Liveness {
            connect_timeout: config.connect_timeout,
            ping_interval: config.ping_interval,
            ping_timeout: config.ping_timeout,
        })
    }

    pub fn with_liveness(mut self, liveness: Liveness) -> Self {
        self.liveness = liveness;
        self
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Observe connection state transitions.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state_tx.send_replace(next);
        if prev != next {
            info!(url = %self.url, "sensor {} -> {}", prev, next);
        }
    }

    /// Connect, read, and reconnect until `cancel` fires.
    pub async fn run<H>(&self, handler: &mut H, cancel: CancellationToken)
    where
        H: FrameHandler + ?Sized,
    {
        while !cancel.is_cancelled() {
            self.set_state(ConnectionState::Connecting);

            let connected = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.connect() => result,
            };

            match connected {
                Ok(ws) => {
                    self.set_state(ConnectionState::Connected);
                    match self.read_frames(ws, handler, &cancel).await {
                        Ok(()) if cancel.is_cancelled() => break,
                        Ok(()) => info!(url = %self.url, "sensor stream ended"),
                        Err(e) => warn!(url = %self.url, "sensor connection lost: {}", e),
                    }
                }
                Err(e) => warn!(url = %self.url, "sensor connection failed: {}", e),
            }

            self.set_state(ConnectionState::Disconnected);
            debug!(retry_in = ?self.retry_interval, "waiting before reconnect");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.retry_interval) => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!(url = %self.url, "sensor supervisor stopped");
    }

    async fn connect(&self) -> Result<SensorStream> {
        let limit = self.liveness.connect_timeout;
        match tokio::time::timeout(limit, connect_async(self.url.as_str())).await {
            Ok(Ok((ws, _))) => Ok(ws),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(HubError::Transport {
                message: format!("no handshake within {:?}", limit),
            }),
        }
    }

    async fn ping(&self, ws: &mut SensorStream) -> Result<()> {
        let limit = self.liveness.ping_timeout;
        match tokio::time::timeout(limit, ws.send(Message::Ping(Vec::new()))).await {
            Ok(sent) => Ok(sent?),
            Err(_) => Err(HubError::Transport {
                message: format!("keepalive ping not written within {:?}", limit),
            }),
        }
    }

    async fn read_frames<H>(
        &self,
        mut ws: SensorStream,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        H: FrameHandler + ?Sized,
    {
        let period = self.liveness.ping_interval;
        let mut keepalive = tokio::time::interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_heard = Instant::now();

        loop {
            let msg = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    if let Err(e) = ws.close(None).await {
                        debug!("sensor close on shutdown failed: {}", e);
                    }
                    return Ok(());
                }
                msg = ws.next() => msg,
                _ = keepalive.tick() => {
                    let silent = last_heard.elapsed();
                    if silent >= self.liveness.silence_limit() {
                        return Err(HubError::Transport {
                            message: format!("sensor silent for {:?}", silent),
                        });
                    }
                    self.ping(&mut ws).await?;
                    continue;
                }
            };
            last_heard = Instant::now();

            let raw = match msg {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Binary(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
                Some(Ok(Message::Close(frame))) => {
                    return Err(HubError::Transport {
                        message: format!("closed by sensor: {:?}", frame),
                    });
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            };

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = handler.handle_frame(&raw) => {}
            }
            // A long pass is not silence from the glove.
            last_heard = Instant::now();
        }
    }
}
