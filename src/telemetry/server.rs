//! WebSocket telemetry endpoint fanning intent events out to UI subscribers.

use crate::error::{HubError, Result};
use crate::net::{bind_listener, pause_after_accept_error};
use crate::telemetry::protocol::TelemetryEvent;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Publishes events to every currently connected subscriber.
pub trait TelemetryBroadcaster: Send + Sync {
    /// Returns how many subscribers the event was queued for.
    fn broadcast(&self, event: &TelemetryEvent) -> Result<usize>;
}

/// In-process side of the telemetry endpoint.
///
/// Clones share one broadcast channel. Subscribers that fall more than
/// `buffer` events behind skip the oldest ones.
#[derive(Debug, Clone)]
pub struct TelemetryHub {
    tx: broadcast::Sender<Arc<str>>,
}

impl TelemetryHub {
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl TelemetryBroadcaster for TelemetryHub {
    fn broadcast(&self, event: &TelemetryEvent) -> Result<usize> {
        let json = event.to_json().map_err(|e| HubError::Telemetry {
            message: format!("Failed to serialize event: {}", e),
        })?;
        // No subscribers is not an error; the event is simply dropped.
        Ok(self.tx.send(Arc::from(json)).unwrap_or(0))
    }
}

/// Listening telemetry endpoint.
pub struct TelemetryServer {
    listener: TcpListener,
    hub: TelemetryHub,
}

impl TelemetryServer {
    /// Bind the endpoint. Failing to bind is fatal for the hub.
    pub async fn bind(addr: &str, hub: TelemetryHub) -> Result<Self> {
        let listener = bind_listener("telemetry", addr).await?;
        Ok(Self { listener, hub })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept subscribers until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "telemetry endpoint listening");
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        // Subscribe before the handshake so nothing broadcast after
                        // accept is missed.
                        let rx = self.hub.subscribe();
                        let cancel = cancel.child_token();
                        tokio::spawn(async move {
                            if let Err(e) = serve_subscriber(stream, peer, rx, cancel).await {
                                warn!(%peer, "telemetry subscriber error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        warn!("telemetry accept failed: {}", e);
                        pause_after_accept_error(&cancel).await;
                    }
                },
            }
        }

        info!("telemetry endpoint stopped");
        Ok(())
    }
}

async fn serve_subscriber(
    stream: TcpStream,
    peer: SocketAddr,
    mut rx: broadcast::Receiver<Arc<str>>,
    cancel: CancellationToken,
) -> Result<()> {
    let ws = accept_async(stream).await?;
    let (mut write, mut read) = ws.split();
    info!(%peer, "telemetry subscriber connected");

    let hello = TelemetryEvent::hello()
        .to_json()
        .map_err(|e| HubError::Telemetry {
            message: format!("Failed to serialize hello: {}", e),
        })?;
    write.send(Message::Text(hello)).await?;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                // Best effort; the peer may already be gone.
                if let Err(e) = write.send(Message::Close(None)).await {
                    debug!(%peer, "close on shutdown failed: {}", e);
                }
                break;
            }
            event = rx.recv() => match event {
                Ok(json) => write.send(Message::Text(json.to_string())).await?,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%peer, skipped, "telemetry subscriber lagging, events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            inbound = read.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => debug!(%peer, "ignoring inbound telemetry message"),
                Some(Err(e)) => return Err(e.into()),
            },
        }
    }

    info!(%peer, "telemetry subscriber disconnected");
    Ok(())
}
