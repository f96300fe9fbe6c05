//! Transport backends
//!
//! [`Transport`] is the one interface the service talks to. Two backends
//! implement it:
//! - [`WarpTransport`]: warp's `ws()` filter, the reference implementation
//! - [`TungsteniteTransport`]: a raw `TcpListener` with `TCP_NODELAY` and a
//!   tuned tokio-tungstenite config, for throughput
//!
//! Both feed [`serve_connection`](crate::connection::serve_connection), so
//! heartbeat, backpressure and decoding behave identically.

mod tungstenite;
mod warp_ws;

pub use self::tungstenite::TungsteniteTransport;
pub use self::warp_ws::WarpTransport;

use crate::connection::ConnectionContext;
use crate::error::TransportError;
use crate::hub::ConnectionHub;
use crate::outbox::{Priority, SendOutcome};
use crate::protocol::ServerMessage;
use crate::frame::WireFrame;
use async_trait::async_trait;
use gesture_session::ConnectionId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Which socket implementation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Warp,
    #[default]
    Tungstenite,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Warp, BackendKind::Tungstenite];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BackendKind::Warp => "warp",
            BackendKind::Tungstenite => "tungstenite",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warp" => Ok(BackendKind::Warp),
            "tungstenite" => Ok(BackendKind::Tungstenite),
            _ => Err(TransportError::UnknownBackend(s.to_string())),
        }
    }
}

/// Per-connection tuning shared by both backends
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// Ping period; a connection silent for one full period after a ping is dropped
    pub heartbeat_interval: Duration,
    /// Outbound bytes beyond which sends are skipped
    pub backpressure_threshold_bytes: usize,
    /// Minimum confidence for publishing a gesture event
    pub forward_confidence_threshold: f32,
    /// Largest inbound message accepted
    pub max_message_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            backpressure_threshold_bytes: 64 * 1024,
            forward_confidence_threshold: 0.9,
            max_message_bytes: 1024 * 1024,
        }
    }
}

/// A started transport
#[derive(Debug)]
pub struct RunningTransport {
    pub kind: BackendKind,
    /// Address actually bound (resolves port 0)
    pub local_addr: SocketAddr,
    /// Accept loop; finishes after shutdown is signalled
    pub task: JoinHandle<()>,
}

impl RunningTransport {
    /// Wait for the accept loop to stop
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::error!("{} transport task failed: {}", self.kind, e);
        }
    }
}

/// A socket backend
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    fn kind(&self) -> BackendKind;

    /// Live connections
    fn hub(&self) -> &Arc<ConnectionHub>;

    /// Bind `addr` and accept connections until `shutdown` turns `true`
    ///
    /// # Errors
    /// Returns `TransportError::Bind` when the address is unavailable.
    async fn start(
        &self,
        addr: SocketAddr,
        shutdown: watch::Receiver<bool>,
    ) -> Result<RunningTransport, TransportError>;

    /// Best-effort send to one connection
    fn send(&self, id: ConnectionId, message: &ServerMessage, priority: Priority) -> SendOutcome {
        match message.encode() {
            Ok(text) => self.hub().send(id, WireFrame::Text(text), priority),
            Err(e) => {
                tracing::error!("Failed to encode message for {}: {}", id, e);
                SendOutcome::Dropped
            }
        }
    }

    /// Close one connection; `false` if it is not live
    fn close(&self, id: ConnectionId, code: u16, reason: &str) -> bool {
        self.hub().close(id, code, reason)
    }

    fn connection_count(&self) -> usize {
        self.hub().connection_count()
    }
}

/// Construct the configured backend
#[must_use]
pub fn build_transport(kind: BackendKind, ctx: Arc<ConnectionContext>) -> Arc<dyn Transport> {
    match kind {
        BackendKind::Warp => Arc::new(WarpTransport::new(ctx)),
        BackendKind::Tungstenite => Arc::new(TungsteniteTransport::new(ctx)),
    }
}
