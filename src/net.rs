//! Listener helpers shared by the inbound WebSocket endpoints.

use crate::defaults;
use crate::error::{HubError, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Bind a TCP listener for the named endpoint.
pub async fn bind_listener(endpoint: &str, addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| HubError::Bind {
            endpoint: endpoint.to_string(),
            addr: addr.to_string(),
            message: e.to_string(),
        })
}

/// Wait before the next `accept` after one failed.
///
/// Errors like EMFILE persist until a connection closes. Returns early on
/// cancellation.
pub async fn pause_after_accept_error(cancel: &CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(defaults::ACCEPT_BACKOFF) => {}
    }
}
