//! Error types for the transport
//!
//! - [`TransportError`]: listener and socket failures
//! - [`DecodeError`]: an inbound payload could not be understood
//! - [`StateError`]: an illegal connection state transition

use crate::state::ConnectionState;
use gesture_classifier::ObservationError;
use std::net::SocketAddr;

/// Reply text for payloads that are not valid messages
pub const INVALID_MESSAGE_FORMAT: &str = "Invalid message format";

/// Listener and socket errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Could not bind the listening port
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Socket IO failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket protocol failure reported by the backend
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Outbound message could not be serialized
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Configured backend name is not recognised
    #[error("unknown transport backend '{0}', expected 'warp' or 'tungstenite'")]
    UnknownBackend(String),
}

impl TransportError {
    /// Create bind error
    pub fn bind(addr: SocketAddr, source: std::io::Error) -> Self {
        Self::Bind { addr, source }
    }

    /// Create websocket error from any backend error
    pub fn websocket(err: impl std::fmt::Display) -> Self {
        Self::WebSocket(err.to_string())
    }

    /// Whether the error stops the whole transport rather than one connection
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Bind { .. })
    }

    /// Whether only the affected connection is lost and the transport keeps
    /// serving others
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::WebSocket(_) | Self::Encode(_))
    }
}

/// Inbound payload rejected
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Not JSON, not an object, or missing required fields
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Well-formed message carrying an unusable observation
    #[error(transparent)]
    InvalidObservation(#[from] ObservationError),
}

impl DecodeError {
    /// Text sent back to the client in the `error` message
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Malformed(_) => INVALID_MESSAGE_FORMAT.to_string(),
            Self::InvalidObservation(e) => e.to_string(),
        }
    }

    /// Whether the connection stays open after the error reply
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Malformed(_) | Self::InvalidObservation(_) => true,
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// Connection state machine violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("illegal connection transition {from:?} -> {to:?}")]
    IllegalTransition {
        from: ConnectionState,
        to: ConnectionState,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_maps_to_fixed_reply() {
        let err = DecodeError::Malformed("expected value".into());
        assert_eq!(err.client_message(), "Invalid message format");
    }

    #[test]
    fn observation_error_is_passed_through() {
        let err = DecodeError::from(ObservationError::WrongLandmarkCount {
            expected: 21,
            found: 3,
        });
        assert_eq!(err.client_message(), "Expected 21 landmarks, received 3");
    }

    #[test]
    fn only_bind_is_fatal() {
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let bind = TransportError::bind(addr, std::io::Error::from(std::io::ErrorKind::AddrInUse));
        assert!(bind.is_fatal());
        assert!(!TransportError::websocket("reset").is_fatal());
    }

    #[test]
    fn connection_errors_are_recoverable() {
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let bind = TransportError::bind(addr, std::io::Error::from(std::io::ErrorKind::AddrInUse));
        assert!(!bind.is_recoverable());
        assert!(!TransportError::UnknownBackend("hyper".into()).is_recoverable());
        assert!(TransportError::websocket("reset").is_recoverable());
        assert!(TransportError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe)).is_recoverable());

        assert!(DecodeError::Malformed("eof".into()).is_recoverable());
        let observation = DecodeError::from(ObservationError::WrongLandmarkCount {
            expected: 21,
            found: 0,
        });
        assert!(observation.is_recoverable());
    }
}
