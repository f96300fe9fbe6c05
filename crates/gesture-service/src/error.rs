//! Error types for the service
//!
//! - [`ConfigError`]: configuration could not be loaded or is invalid
//! - [`ServiceError`]: the service could not start

use gesture_transport::TransportError;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`ServiceConfig`](crate::ServiceConfig)
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be rendered as TOML
    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    /// Environment override has an unusable value
    #[error("{var}='{value}' is invalid: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// Resolved values violate a constraint
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn env(var: &'static str, value: &str, reason: impl std::fmt::Display) -> Self {
        Self::Env {
            var,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Service startup errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Health endpoint could not bind
    #[error("failed to bind health endpoint {addr}: {reason}")]
    HttpBind { addr: SocketAddr, reason: String },

    /// Tracing subscriber could not be installed
    #[error("failed to install tracing subscriber: {0}")]
    Telemetry(String),

    /// `start` called on a service that has been shut down
    #[error("service has been shut down")]
    ShutDown,
}

impl ServiceError {
    /// Whether the process should exit rather than keep serving
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_fatal(),
            Self::Telemetry(_) => false,
            Self::Config(_) | Self::HttpBind { .. } | Self::ShutDown => true,
        }
    }
}
