//! Gesture Transport - persistent connections for the gesture gateway
//!
//! One connection driver, two interchangeable socket backends:
//! - `warp`: the reference backend built on warp's WebSocket filter
//! - `tungstenite`: a bare `TcpListener` feeding tokio-tungstenite directly
//!
//! Both adapt their sockets to [`WireFrame`] streams and sinks and hand them
//! to [`serve_connection`], which owns decoding, heartbeat, backpressure and
//! the per-connection state machine. Neither the session registry nor the
//! classifier sees which backend is running.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod backend;
pub mod connection;
pub mod error;
pub mod events;
pub mod frame;
pub mod hub;
pub mod outbox;
pub mod protocol;
pub mod state;

pub use backend::{
    build_transport, BackendKind, RunningTransport, Transport, TransportConfig, TungsteniteTransport,
    WarpTransport,
};
pub use connection::{
    serve_connection, shutdown_requested, CloseReason, ConnectionContext, CLOSE_GRACE,
};
pub use error::{DecodeError, StateError, TransportError};
pub use events::{BroadcastEventSink, GestureEvent, GestureEventSink, NullEventSink};
pub use frame::{CloseCode, WireFrame};
pub use hub::ConnectionHub;
pub use outbox::{Outbox, Priority, SendOutcome};
pub use protocol::{decode, ClientMessage, ServerMessage};
pub use state::{allowed_transitions, validate_transition, ConnectionState};
