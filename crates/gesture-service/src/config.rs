//! Service configuration
//!
//! Resolution order, later layers winning:
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. `GESTURE_*` environment variables
//! 4. command-line overrides

use crate::error::ConfigError;
use crate::telemetry::LogFormat;
use gesture_classifier::CascadeConfig;
use gesture_session::SessionConfig;
use gesture_transport::{BackendKind, TransportConfig};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Smallest accepted heartbeat interval
pub const MIN_HEARTBEAT_MS: u64 = 10;

/// Complete runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Streaming endpoint port; 0 binds an ephemeral port
    pub ws_port: u16,
    /// Health/stats port; 0 binds an ephemeral port
    pub http_port: u16,
    pub bind_host: IpAddr,
    pub backend: BackendKind,
    pub heartbeat_interval_ms: u64,
    pub backpressure_threshold_bytes: usize,
    pub history_capacity: usize,
    pub sample_capacity: usize,
    pub fps_window: usize,
    pub model_path: PathBuf,
    pub enable_structural_fallback: bool,
    /// Minimum confidence for publishing gesture events
    pub forward_confidence_threshold: f32,
    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        let transport = TransportConfig::default();
        Self {
            ws_port: 8765,
            http_port: 8766,
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            backend: BackendKind::default(),
            heartbeat_interval_ms: 30_000,
            backpressure_threshold_bytes: transport.backpressure_threshold_bytes,
            history_capacity: session.history_capacity,
            sample_capacity: session.sample_capacity,
            fps_window: session.fps_window,
            model_path: CascadeConfig::default().model_path,
            enable_structural_fallback: false,
            forward_confidence_threshold: transport.forward_confidence_threshold,
            log_format: LogFormat::default(),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub http_port: Option<u16>,
    pub host: Option<IpAddr>,
    pub backend: Option<BackendKind>,
    pub heartbeat_ms: Option<u64>,
    pub model: Option<PathBuf>,
    pub log_json: bool,
}

impl CliOverrides {
    pub fn apply(&self, config: &mut ServiceConfig) {
        if let Some(port) = self.port {
            config.ws_port = port;
        }
        if let Some(port) = self.http_port {
            config.http_port = port;
        }
        if let Some(host) = self.host {
            config.bind_host = host;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(ms) = self.heartbeat_ms {
            config.heartbeat_interval_ms = ms;
        }
        if let Some(model) = &self.model {
            config.model_path.clone_from(model);
        }
        if self.log_json {
            config.log_format = LogFormat::Json;
        }
    }
}

impl ServiceConfig {
    /// Resolve every layer and validate the result
    ///
    /// # Errors
    /// Returns the first file, environment or validation error.
    pub fn resolve(file: Option<&Path>, overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file; missing keys keep their defaults
    ///
    /// # Errors
    /// Returns `ConfigError::Io` or `ConfigError::Parse`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        Self::from_toml_str(&text)
    }

    /// # Errors
    /// Returns `ConfigError::Parse` for invalid TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// # Errors
    /// Returns `ConfigError::Render` if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply `GESTURE_*` variables from the process environment
    ///
    /// # Errors
    /// Returns `ConfigError::Env` for a value that does not parse.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|var| std::env::var(var).ok())
    }

    /// Apply `GESTURE_*` variables from an arbitrary lookup
    ///
    /// # Errors
    /// Returns `ConfigError::Env` for a value that does not parse.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &'static str| lookup(var).map(|value| (var, value));

        if let Some((var, value)) = get("GESTURE_WS_PORT") {
            self.ws_port = parse_env(var, &value)?;
        }
        if let Some((var, value)) = get("GESTURE_HTTP_PORT") {
            self.http_port = parse_env(var, &value)?;
        }
        if let Some((var, value)) = get("GESTURE_BIND_HOST") {
            self.bind_host = parse_env(var, &value)?;
        }
        if let Some((var, value)) = get("GESTURE_BACKEND") {
            self.backend = parse_env(var, &value)?;
        }
        if let Some((var, value)) = get("GESTURE_HEARTBEAT_MS") {
            self.heartbeat_interval_ms = parse_env(var, &value)?;
        }
        if let Some((var, value)) = get("GESTURE_BACKPRESSURE_BYTES") {
            self.backpressure_threshold_bytes = parse_env(var, &value)?;
        }
        if let Some((var, value)) = get("GESTURE_HISTORY_CAPACITY") {
            self.history_capacity = parse_env(var, &value)?;
        }
        if let Some((var, value)) = get("GESTURE_SAMPLE_CAPACITY") {
            self.sample_capacity = parse_env(var, &value)?;
        }
        if let Some((_, value)) = get("GESTURE_MODEL_PATH") {
            self.model_path = PathBuf::from(value);
        }
        if let Some((var, value)) = get("GESTURE_STRUCTURAL_FALLBACK") {
            self.enable_structural_fallback = parse_flag(var, &value)?;
        }
        if let Some((var, value)) = get("GESTURE_LOG_FORMAT") {
            self.log_format = parse_env(var, &value)?;
        }
        Ok(())
    }

    /// Check value constraints
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_interval_ms < MIN_HEARTBEAT_MS {
            return Err(ConfigError::Invalid(format!(
                "heartbeat_interval_ms must be at least {MIN_HEARTBEAT_MS}, got {}",
                self.heartbeat_interval_ms
            )));
        }
        if self.backpressure_threshold_bytes == 0 {
            return Err(ConfigError::Invalid(
                "backpressure_threshold_bytes must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.forward_confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "forward_confidence_threshold must be within [0, 1], got {}",
                self.forward_confidence_threshold
            )));
        }
        self.session_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    #[must_use]
    pub fn ws_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.ws_port)
    }

    #[must_use]
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.http_port)
    }

    #[inline]
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            history_capacity: self.history_capacity,
            sample_capacity: self.sample_capacity,
            fps_window: self.fps_window,
            ..SessionConfig::default()
        }
    }

    #[must_use]
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            heartbeat_interval: self.heartbeat_interval(),
            backpressure_threshold_bytes: self.backpressure_threshold_bytes,
            forward_confidence_threshold: self.forward_confidence_threshold,
            ..TransportConfig::default()
        }
    }

    #[must_use]
    pub fn cascade_config(&self) -> CascadeConfig {
        CascadeConfig {
            model_path: self.model_path.clone(),
            enable_structural_fallback: self.enable_structural_fallback,
            ..CascadeConfig::default()
        }
    }
}

fn parse_env<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| ConfigError::env(var, value, e))
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env(var, value, "expected true or false")),
    }
}
