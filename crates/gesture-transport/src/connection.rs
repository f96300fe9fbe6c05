//! Connection driver shared by every backend
//!
//! A backend adapts its socket into a stream and a sink of [`WireFrame`]s
//! and calls [`serve_connection`]. The driver task owns the inbound stream
//! and the [`Session`]; a companion writer task owns the sink and drains the
//! connection's [`Outbox`].
//!
//! The driver waits on four things: the next inbound frame, the heartbeat
//! timer, the shutdown signal, and the outbox closing (a close requested
//! through the hub, or a failed write).

use crate::backend::TransportConfig;
use crate::error::TransportError;
use crate::events::{GestureEvent, GestureEventSink};
use crate::frame::{CloseCode, WireFrame};
use crate::hub::ConnectionHub;
use crate::outbox::{Outbox, Priority, SendOutcome};
use crate::protocol::{self, now_millis, ClientMessage, ServerMessage};
use crate::state::{ConnectionState, StateTracker};
use futures::{Sink, SinkExt, Stream, StreamExt};
use gesture_session::{ConnectionId, Session, SessionRegistry};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// How long the writer may take to flush its final frame once the
/// connection is closing
pub const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Everything a connection needs, shared across connections
pub struct ConnectionContext {
    pub registry: Arc<SessionRegistry>,
    pub hub: Arc<ConnectionHub>,
    pub events: Arc<dyn GestureEventSink>,
    pub config: TransportConfig,
}

impl fmt::Debug for ConnectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionContext")
            .field("registry", &self.registry)
            .field("connections", &self.hub.connection_count())
            .field("events", &self.events)
            .field("config", &self.config)
            .finish()
    }
}

impl ConnectionContext {
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry>,
        events: Arc<dyn GestureEventSink>,
        config: TransportConfig,
    ) -> Self {
        Self {
            registry,
            hub: Arc::new(ConnectionHub::new()),
            events,
            config,
        }
    }
}

/// Why a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    /// The client closed the socket or sent a close frame
    PeerClosed,
    /// No pong arrived within one heartbeat interval
    HeartbeatTimeout,
    /// Reading from the socket failed
    TransportError,
    /// The server is stopping
    ServerShutdown,
    /// Closed through the hub, or the writer failed
    LocalClose,
}

impl CloseReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            CloseReason::PeerClosed => "peer closed",
            CloseReason::HeartbeatTimeout => "heartbeat timeout",
            CloseReason::TransportError => "transport error",
            CloseReason::ServerShutdown => "server shutdown",
            CloseReason::LocalClose => "closed locally",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves once `shutdown` holds `true` or its sender is gone
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Drive one accepted connection until it closes
///
/// Returns why the connection ended. The session is closed, and its summary
/// logged, exactly once on every path.
pub async fn serve_connection<S, K>(
    ctx: Arc<ConnectionContext>,
    mut inbound: S,
    outbound: K,
    mut shutdown: watch::Receiver<bool>,
) -> CloseReason
where
    S: Stream<Item = Result<WireFrame, TransportError>> + Unpin + Send,
    K: Sink<WireFrame, Error = TransportError> + Unpin + Send + 'static,
{
    let id = ConnectionId::new();
    let mut state = StateTracker::default();
    let outbox = Arc::new(Outbox::new(ctx.config.backpressure_threshold_bytes));
    ctx.hub.register(id, Arc::clone(&outbox));
    let mut writer = tokio::spawn(write_loop(id, Arc::clone(&outbox), outbound));

    let mut session = ctx.registry.open(id);
    state.advance(ConnectionState::Open);
    tracing::info!("Connection {} opened ({} live)", id, ctx.hub.connection_count());
    send_message(
        &outbox,
        &ServerMessage::connected(id, ctx.registry.supported_gestures()),
        Priority::High,
    );

    let period = ctx.config.heartbeat_interval;
    let mut heartbeat = interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut awaiting_pong = false;
    let mut last_pong_at = Instant::now();

    let reason = loop {
        tokio::select! {
            frame = inbound.next() => match frame {
                None => break CloseReason::PeerClosed,
                Some(Err(e)) => {
                    if e.is_recoverable() {
                        tracing::warn!("Connection {} transport error: {}", id, e);
                    } else {
                        tracing::error!("Connection {} transport error: {}", id, e);
                    }
                    break CloseReason::TransportError;
                }
                Some(Ok(WireFrame::Text(text))) => {
                    state.advance(ConnectionState::Active);
                    handle_payload(&ctx, &mut session, &outbox, text.as_bytes());
                }
                Some(Ok(WireFrame::Binary(bytes))) => {
                    state.advance(ConnectionState::Active);
                    handle_payload(&ctx, &mut session, &outbox, &bytes);
                }
                Some(Ok(WireFrame::Pong(_))) => {
                    awaiting_pong = false;
                    last_pong_at = Instant::now();
                }
                // Protocol pings are answered by the backend.
                Some(Ok(WireFrame::Ping(_))) => {}
                Some(Ok(WireFrame::Close(frame))) => {
                    tracing::debug!("Connection {} close frame: {:?}", id, frame);
                    break CloseReason::PeerClosed;
                }
            },
            _ = heartbeat.tick() => {
                if awaiting_pong {
                    tracing::warn!(
                        "Connection {} missed heartbeat, last pong {} ms ago; terminating",
                        id,
                        last_pong_at.elapsed().as_millis()
                    );
                    break CloseReason::HeartbeatTimeout;
                }
                awaiting_pong = true;
                outbox.push(WireFrame::Ping(Vec::new()), Priority::High);
            }
            () = shutdown_requested(&mut shutdown) => break CloseReason::ServerShutdown,
            () = outbox.closed() => break CloseReason::LocalClose,
        }
    };

    state.advance(ConnectionState::Closing);
    ctx.hub.remove(id);

    match reason {
        CloseReason::HeartbeatTimeout | CloseReason::TransportError => {
            outbox.abort();
            writer.abort();
        }
        CloseReason::ServerShutdown => {
            outbox.shutdown(Some(WireFrame::close(
                CloseCode::GOING_AWAY,
                "server shutting down",
            )));
            finish_writer(&mut writer).await;
        }
        CloseReason::PeerClosed | CloseReason::LocalClose => {
            outbox.shutdown(None);
            finish_writer(&mut writer).await;
        }
    }

    let summary = ctx.registry.close(session);
    state.advance(ConnectionState::Closed);
    tracing::debug!("Connection {} reached {:?}", id, state.get());
    tracing::info!(
        "Connection {} closed ({}): {} gestures in {} ms, {} results dropped",
        id,
        reason,
        summary.total_gestures,
        summary.duration_ms,
        outbox.dropped()
    );
    reason
}

async fn finish_writer(writer: &mut JoinHandle<()>) {
    if tokio::time::timeout(CLOSE_GRACE, &mut *writer).await.is_err() {
        tracing::debug!("Writer did not finish within {:?}, aborting", CLOSE_GRACE);
        writer.abort();
    }
}

async fn write_loop<K>(id: ConnectionId, outbox: Arc<Outbox>, mut sink: K)
where
    K: Sink<WireFrame, Error = TransportError> + Unpin,
{
    while let Some(frame) = outbox.next().await {
        let len = frame.len();
        let is_close = frame.is_close();
        if let Err(e) = sink.send(frame).await {
            tracing::debug!("Connection {} write failed: {}", id, e);
            outbox.abort();
            return;
        }
        outbox.complete(len);
        if is_close {
            break;
        }
    }
    if let Err(e) = sink.close().await {
        tracing::debug!("Connection {} sink close: {}", id, e);
    }
}

fn handle_payload(ctx: &ConnectionContext, session: &mut Session, outbox: &Outbox, payload: &[u8]) {
    let arrival = std::time::Instant::now();

    match protocol::decode(payload) {
        Ok(ClientMessage::HandLandmarks {
            observation,
            frame_id,
            client_processing_ms,
        }) => {
            let result = ctx.registry.handle(session, &observation, arrival);
            tracing::debug!(
                "Connection {} frame {:?}: {} ({:.2}) via {} in {:.3} ms (client {:?} ms)",
                session.id(),
                frame_id,
                result.label(),
                result.confidence(),
                result.prediction.tier,
                result.perf.latency_ms,
                client_processing_ms
            );

            if let Some(event) = GestureEvent::from_result(
                session.id(),
                &result,
                ctx.config.forward_confidence_threshold,
                now_millis(),
            ) {
                ctx.events.publish(event);
            }

            let message = ServerMessage::gesture_result(&result, frame_id);
            if send_message(outbox, &message, Priority::Routine) == SendOutcome::Queued {
                ctx.registry.record_delivery(session, arrival);
            }
        }
        Ok(ClientMessage::Ping) => {
            send_message(outbox, &ServerMessage::pong(), Priority::High);
        }
        Ok(ClientMessage::Unknown(kind)) => {
            tracing::warn!("Connection {} sent unknown message type '{}'", session.id(), kind);
        }
        Err(e) => {
            tracing::debug!("Connection {} sent undecodable payload: {}", session.id(), e);
            send_message(outbox, &ServerMessage::error(e.client_message()), Priority::High);
        }
    }
}

fn send_message(outbox: &Outbox, message: &ServerMessage, priority: Priority) -> SendOutcome {
    match message.encode() {
        Ok(text) => outbox.push(WireFrame::Text(text), priority),
        Err(e) => {
            tracing::error!("Failed to encode outbound message: {}", e);
            SendOutcome::Dropped
        }
    }
}
