//! Gesture events for downstream consumers
//!
//! High-confidence, mapped results are published to a [`GestureEventSink`].
//! Publishing is fire-and-forget: no subscriber can slow a connection down.

use gesture_classifier::{GestureLabel, OperationMapping};
use gesture_session::{ConnectionId, GestureResult};
use serde::Serialize;
use tokio::sync::broadcast;

/// A recognised gesture worth acting on
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureEvent {
    pub connection_id: ConnectionId,
    pub gesture: GestureLabel,
    pub confidence: f32,
    pub operation: &'static OperationMapping,
    pub timestamp: i64,
}

impl GestureEvent {
    /// Event for a result that clears `threshold` and maps to an operation
    #[must_use]
    pub fn from_result(
        connection_id: ConnectionId,
        result: &GestureResult,
        threshold: f32,
        timestamp: i64,
    ) -> Option<Self> {
        let operation = result.operation?;
        (result.confidence() >= threshold).then(|| Self {
            connection_id,
            gesture: result.label(),
            confidence: result.confidence(),
            operation,
            timestamp,
        })
    }
}

/// Receiver of gesture events; must not block
pub trait GestureEventSink: Send + Sync + std::fmt::Debug {
    fn publish(&self, event: GestureEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl GestureEventSink for NullEventSink {
    fn publish(&self, _: GestureEvent) {}
}

/// Fans events out over a tokio broadcast channel
///
/// Lagging subscribers lose the oldest events; with no subscribers events
/// are discarded.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<GestureEvent>,
}

impl BroadcastEventSink {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GestureEvent> {
        self.sender.subscribe()
    }

    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl GestureEventSink for BroadcastEventSink {
    fn publish(&self, event: GestureEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Gesture event dropped, no subscribers");
        }
    }
}
