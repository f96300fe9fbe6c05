//! Per-connection outbound queue with backpressure
//!
//! Senders never wait. Once the bytes queued or in flight exceed the
//! threshold the outbox is saturated:
//! - routine frames (gesture results) are dropped, so the client always
//!   gets the latest result rather than a growing backlog
//! - high-priority frames (errors, pongs, pings) are parked in a small
//!   deferred list and requeued once the buffer drains to half the threshold
//!
//! A single writer task consumes frames with [`Outbox::next`] and reports
//! each completed write with [`Outbox::complete`].

use crate::frame::WireFrame;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;

/// Deferred high-priority frames kept while saturated
pub const DEFERRED_LIMIT: usize = 16;

/// How a frame is treated under backpressure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Superseded by the next result; dropped when saturated
    Routine,
    /// Replies and control frames; deferred when saturated
    High,
}

/// Result of [`Outbox::push`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendOutcome {
    Queued,
    /// Held until the buffer drains
    Deferred,
    /// Skipped because the buffer was saturated
    Dropped,
    /// The connection is closing
    Closed,
}

#[derive(Debug, Default)]
struct OutboxState {
    queue: VecDeque<WireFrame>,
    deferred: VecDeque<WireFrame>,
    buffered_bytes: usize,
    drain_pending: bool,
    closed: bool,
    final_frame: Option<WireFrame>,
    dropped: u64,
}

/// Bounded outbound queue for one connection
#[derive(Debug)]
pub struct Outbox {
    state: Mutex<OutboxState>,
    ready: Notify,
    closed: Notify,
    threshold: usize,
}

impl Outbox {
    /// Create outbox; a threshold of zero is raised to one byte
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            state: Mutex::new(OutboxState::default()),
            ready: Notify::new(),
            closed: Notify::new(),
            threshold: threshold.max(1),
        }
    }

    /// Enqueue a frame without waiting
    pub fn push(&self, frame: WireFrame, priority: Priority) -> SendOutcome {
        let mut state = self.state.lock();
        if state.closed {
            return SendOutcome::Closed;
        }

        if state.buffered_bytes > self.threshold {
            state.drain_pending = true;
            return match priority {
                Priority::Routine => {
                    state.dropped += 1;
                    if state.dropped % 100 == 1 {
                        tracing::warn!(
                            "Outbound buffer saturated ({} bytes), {} results dropped so far",
                            state.buffered_bytes,
                            state.dropped
                        );
                    }
                    SendOutcome::Dropped
                }
                Priority::High => {
                    if state.deferred.len() >= DEFERRED_LIMIT {
                        state.deferred.pop_front();
                    }
                    state.deferred.push_back(frame);
                    SendOutcome::Deferred
                }
            };
        }

        state.buffered_bytes += frame.len();
        state.queue.push_back(frame);
        drop(state);
        self.ready.notify_one();
        SendOutcome::Queued
    }

    /// Next frame for the writer; `None` once closed and drained
    ///
    /// After a graceful shutdown the final frame is yielded once.
    pub async fn next(&self) -> Option<WireFrame> {
        loop {
            {
                let mut state = self.state.lock();
                if state.closed {
                    return state.final_frame.take();
                }
                if let Some(frame) = state.queue.pop_front() {
                    return Some(frame);
                }
            }
            self.ready.notified().await;
        }
    }

    /// Report that `len` bytes left the process
    pub fn complete(&self, len: usize) {
        let mut state = self.state.lock();
        state.buffered_bytes = state.buffered_bytes.saturating_sub(len);

        if state.drain_pending && !state.closed && state.buffered_bytes <= self.threshold / 2 {
            state.drain_pending = false;
            let retried = state.deferred.len();
            while let Some(frame) = state.deferred.pop_front() {
                state.buffered_bytes += frame.len();
                state.queue.push_back(frame);
            }
            drop(state);
            if retried > 0 {
                tracing::debug!("Outbound buffer drained, retrying {} deferred frames", retried);
                self.ready.notify_one();
            }
        }
    }

    /// Stop accepting frames, cancel everything pending and let the writer
    /// send `final_frame` (usually a close frame) before it stops
    pub fn shutdown(&self, final_frame: Option<WireFrame>) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.queue.clear();
        state.deferred.clear();
        state.final_frame = final_frame;
        drop(state);
        self.ready.notify_one();
        self.closed.notify_waiters();
    }

    /// Stop immediately without a final frame
    pub fn abort(&self) {
        self.shutdown(None);
    }

    /// Resolves once the outbox has been shut down
    pub async fn closed(&self) {
        loop {
            let notified = self.closed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Bytes queued or in flight
    #[must_use]
    pub fn buffered_bytes(&self) -> usize {
        self.state.lock().buffered_bytes
    }

    #[must_use]
    pub fn queued_frames(&self) -> usize {
        self.state.lock().queue.len()
    }

    #[must_use]
    pub fn deferred_frames(&self) -> usize {
        self.state.lock().deferred.len()
    }

    #[must_use]
    pub fn drain_pending(&self) -> bool {
        self.state.lock().drain_pending
    }

    /// Routine frames dropped under backpressure
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.state.lock().dropped
    }

    #[inline]
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }
}
