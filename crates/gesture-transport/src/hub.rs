//! Live connection table
//!
//! Maps connection ids to their outboxes so anything holding the hub can
//! send to, or close, a specific connection.

use crate::frame::WireFrame;
use crate::outbox::{Outbox, Priority, SendOutcome};
use dashmap::DashMap;
use gesture_session::ConnectionId;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct ConnectionHub {
    connections: DashMap<ConnectionId, Arc<Outbox>>,
}

impl ConnectionHub {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, id: ConnectionId, outbox: Arc<Outbox>) {
        self.connections.insert(id, outbox);
    }

    pub(crate) fn remove(&self, id: ConnectionId) {
        self.connections.remove(&id);
    }

    /// Best-effort send; `Closed` if the connection is unknown
    pub fn send(&self, id: ConnectionId, frame: WireFrame, priority: Priority) -> SendOutcome {
        match self.connections.get(&id) {
            Some(outbox) => outbox.push(frame, priority),
            None => SendOutcome::Closed,
        }
    }

    /// Close one connection with a status code; `false` if unknown
    pub fn close(&self, id: ConnectionId, code: u16, reason: &str) -> bool {
        match self.connections.get(&id) {
            Some(outbox) => {
                outbox.shutdown(Some(WireFrame::close(code, reason)));
                true
            }
            None => false,
        }
    }

    /// Close every connection; returns how many were signalled
    pub fn close_all(&self, code: u16, reason: &str) -> usize {
        let mut count = 0;
        for entry in &self.connections {
            entry.value().shutdown(Some(WireFrame::close(code, reason)));
            count += 1;
        }
        count
    }

    /// Bytes queued or in flight for one connection; `None` if unknown
    #[must_use]
    pub fn buffered_bytes(&self, id: ConnectionId) -> Option<usize> {
        self.connections.get(&id).map(|outbox| outbox.buffered_bytes())
    }

    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.connections.iter().map(|e| *e.key()).collect()
    }
}
