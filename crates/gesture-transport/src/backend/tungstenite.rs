//! Raw tokio-tungstenite backend
//!
//! Accepts on a plain `TcpListener`, disables Nagle on every socket and
//! upgrades with a size-limited `WebSocketConfig`. A failed accept (for
//! example when the process is out of file descriptors) backs off for
//! `ACCEPT_BACKOFF` before the listener is polled again.

use super::{BackendKind, RunningTransport, Transport};
use crate::connection::{serve_connection, shutdown_requested, ConnectionContext};
use crate::error::TransportError;
use crate::frame::WireFrame;
use crate::hub::ConnectionHub;
use async_trait::async_trait;
use futures::{future, SinkExt, StreamExt};
use std::borrow::Cow;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, WebSocketConfig};
use tokio_tungstenite::tungstenite::Message;

/// Pause after a failed accept
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct TungsteniteTransport {
    ctx: Arc<ConnectionContext>,
}

impl TungsteniteTransport {
    #[must_use]
    pub fn new(ctx: Arc<ConnectionContext>) -> Self {
        Self { ctx }
    }

    fn socket_config(&self) -> WebSocketConfig {
        let mut config = WebSocketConfig::default();
        config.max_message_size = Some(self.ctx.config.max_message_bytes);
        config.max_frame_size = Some(self.ctx.config.max_message_bytes);
        config
    }
}

#[async_trait]
impl Transport for TungsteniteTransport {
    fn kind(&self) -> BackendKind {
        BackendKind::Tungstenite
    }

    fn hub(&self) -> &Arc<ConnectionHub> {
        &self.ctx.hub
    }

    async fn start(
        &self,
        addr: SocketAddr,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<RunningTransport, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::bind(addr, e))?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Tungstenite transport listening on ws://{}", local_addr);

        let ctx = Arc::clone(&self.ctx);
        let config = self.socket_config();
        let connection_shutdown = shutdown.clone();

        let task = tokio::spawn(async move {
            let mut accept = || listener.accept();
            while let Some((stream, peer)) = next_accepted(&mut accept, &mut shutdown).await {
                tokio::spawn(handle_socket(
                    Arc::clone(&ctx),
                    stream,
                    peer,
                    config,
                    connection_shutdown.clone(),
                ));
            }
            tracing::info!("Tungstenite transport on {} stopped accepting", local_addr);
        });

        Ok(RunningTransport {
            kind: BackendKind::Tungstenite,
            local_addr,
            task,
        })
    }
}

/// Next accepted connection, or `None` once shutdown is requested
async fn next_accepted<T, F, Fut>(
    accept: &mut F,
    shutdown: &mut watch::Receiver<bool>,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    loop {
        tokio::select! {
            accepted = accept() => match accepted {
                Ok(item) => return Some(item),
                Err(e) => tracing::warn!("Accept failed: {}, retrying in {:?}", e, ACCEPT_BACKOFF),
            },
            () = shutdown_requested(shutdown) => return None,
        }
        tokio::select! {
            () = tokio::time::sleep(ACCEPT_BACKOFF) => {}
            () = shutdown_requested(shutdown) => return None,
        }
    }
}

async fn handle_socket(
    ctx: Arc<ConnectionContext>,
    stream: TcpStream,
    peer: SocketAddr,
    config: WebSocketConfig,
    shutdown: watch::Receiver<bool>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::warn!("Failed to set TCP_NODELAY for {}: {}", peer, e);
    }

    let socket = match tokio_tungstenite::accept_async_with_config(stream, Some(config)).await {
        Ok(socket) => socket,
        Err(e) => {
            tracing::warn!("WebSocket handshake with {} failed: {}", peer, e);
            return;
        }
    };
    tracing::debug!("Accepted WebSocket from {}", peer);

    let (sink, stream) = socket.split();
    let inbound = stream.filter_map(|item| {
        future::ready(match item {
            Ok(message) => from_message(message).map(Ok),
            Err(e) => Some(Err(TransportError::websocket(e))),
        })
    });
    let outbound = sink
        .sink_map_err(TransportError::websocket)
        .with(|frame: WireFrame| future::ready(Ok::<_, TransportError>(to_message(frame))));

    let reason = serve_connection(ctx, inbound, outbound, shutdown).await;
    tracing::debug!("Socket from {} finished: {}", peer, reason);
}

fn from_message(message: Message) -> Option<WireFrame> {
    match message {
        Message::Text(text) => Some(WireFrame::Text(text)),
        Message::Binary(bytes) => Some(WireFrame::Binary(bytes)),
        Message::Ping(bytes) => Some(WireFrame::Ping(bytes)),
        Message::Pong(bytes) => Some(WireFrame::Pong(bytes)),
        Message::Close(frame) => Some(WireFrame::Close(
            frame.map(|f| (u16::from(f.code), f.reason.into_owned())),
        )),
        // Raw frames are only produced when writing
        Message::Frame(_) => None,
    }
}

fn to_message(frame: WireFrame) -> Message {
    match frame {
        WireFrame::Text(text) => Message::Text(text),
        WireFrame::Binary(bytes) => Message::Binary(bytes),
        WireFrame::Ping(bytes) => Message::Ping(bytes),
        WireFrame::Pong(bytes) => Message::Pong(bytes),
        WireFrame::Close(frame) => Message::Close(frame.map(|(code, reason)| CloseFrame {
            code: CloseCode::from(code),
            reason: Cow::Owned(reason),
        })),
    }
}
