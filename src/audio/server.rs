//! WebSocket audio-ingestion endpoint.
//!
//! Each binary message is one complete WAV file. It is decoded, transcribed
//! on a blocking thread, and the text replaces the shared transcript. Nothing
//! is sent back to the sender.

use crate::audio::transcript::TranscriptSlot;
use crate::audio::wav::decode_wav;
use crate::error::{HubError, Result};
use crate::net::{bind_listener, pause_after_accept_error};
use crate::stt::transcriber::Transcriber;
use futures_util::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Transcribes WAV payloads into a `TranscriptSlot`.
#[derive(Clone)]
pub struct AudioIngest {
    transcriber: Arc<dyn Transcriber>,
    slot: TranscriptSlot,
}

impl AudioIngest {
    pub fn new(transcriber: Arc<dyn Transcriber>, slot: TranscriptSlot) -> Self {
        Self { transcriber, slot }
    }

    /// Decode and transcribe one payload.
    ///
    /// Returns the transcript if it replaced the slot, `None` if it was blank.
    pub async fn ingest(&self, payload: Vec<u8>) -> Result<Option<String>> {
        let transcriber = Arc::clone(&self.transcriber);
        let text = tokio::task::spawn_blocking(move || {
            let samples = decode_wav(&payload)?;
            transcriber.transcribe(&samples)
        })
        .await
        .map_err(|e| HubError::Transcription {
            message: format!("Transcription task failed: {}", e),
        })??;

        if self.slot.replace(&text) {
            Ok(Some(text.trim().to_string()))
        } else {
            Ok(None)
        }
    }
}

/// Listening audio endpoint.
pub struct AudioServer {
    listener: TcpListener,
    ingest: AudioIngest,
}

impl AudioServer {
    /// Bind the endpoint. Failing to bind is fatal for the hub.
    pub async fn bind(addr: &str, ingest: AudioIngest) -> Result<Self> {
        let listener = bind_listener("audio", addr).await?;
        Ok(Self { listener, ingest })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept audio senders until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "audio endpoint listening");
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let ingest = self.ingest.clone();
                        let cancel = cancel.child_token();
                        tokio::spawn(async move {
                            if let Err(e) = serve_sender(stream, peer, ingest, cancel).await {
                                warn!(%peer, "audio connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        warn!("audio accept failed: {}", e);
                        pause_after_accept_error(&cancel).await;
                    }
                },
            }
        }

        info!("audio endpoint stopped");
        Ok(())
    }
}

async fn serve_sender(
    stream: TcpStream,
    peer: SocketAddr,
    ingest: AudioIngest,
    cancel: CancellationToken,
) -> Result<()> {
    let mut ws = accept_async(stream).await?;
    info!(%peer, "audio sender connected");

    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            msg = ws.next() => msg,
        };

        match msg {
            Some(Ok(Message::Binary(payload))) => {
                debug!(%peer, bytes = payload.len(), "audio payload received");
                match ingest.ingest(payload).await {
                    Ok(Some(text)) => info!(%peer, "transcript updated: {}", text),
                    Ok(None) => debug!(%peer, "no speech detected"),
                    Err(e) => warn!(%peer, "audio payload dropped: {}", e),
                }
            }
            Some(Ok(Message::Text(_))) => debug!(%peer, "ignoring text message on audio endpoint"),
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }

    info!(%peer, "audio sender disconnected");
    Ok(())
}
