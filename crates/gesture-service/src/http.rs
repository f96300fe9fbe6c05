//! HTTP health and statistics endpoints
//!
//! - `GET /health`: liveness, live connection count, active model tier, uptime
//! - `GET /stats`: aggregate statistics across live sessions

use gesture_classifier::ModelState;
use gesture_session::SessionRegistry;
use gesture_transport::ConnectionHub;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use warp::{Filter, Rejection, Reply};

/// State shared by the HTTP handlers
#[derive(Debug)]
pub struct HttpState {
    registry: Arc<SessionRegistry>,
    hub: Arc<ConnectionHub>,
    started: Instant,
}

impl HttpState {
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>, hub: Arc<ConnectionHub>) -> Self {
        Self {
            registry,
            hub,
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy",
            active_connections: self.hub.connection_count(),
            model_tier: self.registry.model_state(),
            uptime_seconds: self.started.elapsed().as_secs(),
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub active_connections: usize,
    pub model_tier: ModelState,
    pub uptime_seconds: u64,
}

/// All HTTP routes
pub fn routes(
    state: Arc<HttpState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    health(Arc::clone(&state)).or(stats(state))
}

fn with_state(
    state: Arc<HttpState>,
) -> impl Filter<Extract = (Arc<HttpState>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || Arc::clone(&state))
}

fn health(
    state: Arc<HttpState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .map(|state: Arc<HttpState>| warp::reply::json(&state.health()))
}

fn stats(
    state: Arc<HttpState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path("stats")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .map(|state: Arc<HttpState>| warp::reply::json(&state.registry.aggregate_stats()))
}
