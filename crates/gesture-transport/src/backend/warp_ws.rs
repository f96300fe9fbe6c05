//! warp backend
//!
//! Serves the gateway at `/` through warp's `ws()` filter and shuts down
//! gracefully with the rest of the service.

use super::{BackendKind, RunningTransport, Transport};
use crate::connection::{serve_connection, shutdown_requested, ConnectionContext};
use crate::error::TransportError;
use crate::frame::WireFrame;
use crate::hub::ConnectionHub;
use async_trait::async_trait;
use futures::{future, SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use warp::ws::{Message, WebSocket, Ws};
use warp::Filter;

#[derive(Debug)]
pub struct WarpTransport {
    ctx: Arc<ConnectionContext>,
}

impl WarpTransport {
    #[must_use]
    pub fn new(ctx: Arc<ConnectionContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Transport for WarpTransport {
    fn kind(&self) -> BackendKind {
        BackendKind::Warp
    }

    fn hub(&self) -> &Arc<ConnectionHub> {
        &self.ctx.hub
    }

    async fn start(
        &self,
        addr: SocketAddr,
        shutdown: watch::Receiver<bool>,
    ) -> Result<RunningTransport, TransportError> {
        let ctx = Arc::clone(&self.ctx);
        let max_message = self.ctx.config.max_message_bytes;
        let connection_shutdown = shutdown.clone();

        let route = warp::path::end()
            .and(warp::ws())
            .and(warp::addr::remote())
            .map(move |ws: Ws, peer: Option<SocketAddr>| {
                let ctx = Arc::clone(&ctx);
                let shutdown = connection_shutdown.clone();
                ws.max_message_size(max_message)
                    .max_frame_size(max_message)
                    .on_upgrade(move |socket| handle_socket(ctx, socket, peer, shutdown))
            });

        let mut server_shutdown = shutdown;
        let (local_addr, server) = warp::serve(route)
            .try_bind_with_graceful_shutdown(addr, async move {
                shutdown_requested(&mut server_shutdown).await;
            })
            .map_err(|e| TransportError::bind(addr, std::io::Error::other(e.to_string())))?;
        tracing::info!("Warp transport listening on ws://{}", local_addr);

        let task = tokio::spawn(async move {
            server.await;
            tracing::info!("Warp transport on {} stopped accepting", local_addr);
        });

        Ok(RunningTransport {
            kind: BackendKind::Warp,
            local_addr,
            task,
        })
    }
}

async fn handle_socket(
    ctx: Arc<ConnectionContext>,
    socket: WebSocket,
    peer: Option<SocketAddr>,
    shutdown: watch::Receiver<bool>,
) {
    tracing::debug!("Accepted WebSocket from {:?}", peer);

    let (sink, stream) = socket.split();
    let inbound = stream.map(|item| item.map(from_message).map_err(TransportError::websocket));
    let outbound = sink
        .sink_map_err(TransportError::websocket)
        .with(|frame: WireFrame| future::ready(Ok::<_, TransportError>(to_message(frame))));

    let reason = serve_connection(ctx, inbound, outbound, shutdown).await;
    tracing::debug!("Socket from {:?} finished: {}", peer, reason);
}

fn from_message(message: Message) -> WireFrame {
    if message.is_close() {
        return WireFrame::Close(
            message
                .close_frame()
                .map(|(code, reason)| (code, reason.to_string())),
        );
    }
    if message.is_ping() {
        return WireFrame::Ping(message.into_bytes());
    }
    if message.is_pong() {
        return WireFrame::Pong(message.into_bytes());
    }
    let text = message.to_str().map(str::to_owned);
    match text {
        Ok(text) if message.is_text() => WireFrame::Text(text),
        _ => WireFrame::Binary(message.into_bytes()),
    }
}

fn to_message(frame: WireFrame) -> Message {
    match frame {
        WireFrame::Text(text) => Message::text(text),
        WireFrame::Binary(bytes) => Message::binary(bytes),
        WireFrame::Ping(bytes) => Message::ping(bytes),
        WireFrame::Pong(bytes) => Message::pong(bytes),
        WireFrame::Close(Some((code, reason))) => Message::close_with(code, reason),
        WireFrame::Close(None) => Message::close(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_frames_keep_code_and_reason() {
        let message = to_message(WireFrame::close(1001, "server shutting down"));
        assert_eq!(message.close_frame(), Some((1001, "server shutting down")));
        assert_eq!(
            from_message(message),
            WireFrame::Close(Some((1001, "server shutting down".into())))
        );
    }

    #[test]
    fn data_frames_convert_both_ways() {
        assert_eq!(from_message(Message::text("hi")), WireFrame::Text("hi".into()));
        assert_eq!(from_message(Message::binary(vec![1, 2])), WireFrame::Binary(vec![1, 2]));
        assert!(to_message(WireFrame::Pong(vec![])).is_pong());
    }
}
