//! Gesture Session - per-connection state for the gesture gateway
//!
//! One [`Session`] exists per live connection and is owned by the task
//! driving that connection. The [`SessionRegistry`] performs the
//! classify / record / summarize steps and publishes read-only
//! [`SessionStats`] snapshots for the health and stats endpoints.
//!
//! All buffers are fixed-capacity [`RingBuffer`]s; every call is O(1)
//! amortized plus the classifier.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod registry;
pub mod ring_buffer;
pub mod session;
pub mod stats;

pub use config::SessionConfig;
pub use error::SessionError;
pub use registry::SessionRegistry;
pub use ring_buffer::RingBuffer;
pub use session::{ConnectionId, GestureRecord, GestureResult, PerfSnapshot, Session, SessionSummary};
pub use stats::{AggregateStats, SessionStats};
