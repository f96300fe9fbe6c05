//! Gesture Service - the assembled gesture gateway
//!
//! Resolves [`ServiceConfig`], initializes the classifier cascade, and runs
//! the configured transport backend next to a small HTTP server:
//! - `ws://<host>:<ws_port>/`: the streaming endpoint
//! - `http://<host>:<http_port>/health` and `/stats`
//!
//! # Example
//!
//! ```rust,ignore
//! use gesture_service::{GestureService, ServiceConfig};
//!
//! let service = GestureService::new(ServiceConfig::default())?;
//! service.run_until(async { tokio::signal::ctrl_c().await.ok(); }).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod http;
pub mod service;
pub mod telemetry;

pub use config::{CliOverrides, ServiceConfig};
pub use error::{ConfigError, ServiceError};
pub use http::{HealthReport, HttpState};
pub use service::{GestureService, RunningService};
pub use telemetry::LogFormat;
