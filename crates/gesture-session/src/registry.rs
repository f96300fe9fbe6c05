//! Session registry
//!
//! Runs the per-observation pipeline for sessions owned by connection tasks:
//! - `open`: allocate a session and publish an empty stats snapshot
//! - `handle`: classify, map the operation, record history and latency
//! - `record_delivery`: add an end-to-end latency sample
//! - `close`: consume the session and return its summary
//!
//! Sessions themselves never enter the registry; only their published
//! [`SessionStats`] do, so readers never contend with the hot path. Each
//! published entry carries the generation of the session that owns it, so a
//! session replaced by a re-open can no longer touch its successor's entry.

use crate::config::SessionConfig;
use crate::session::{ConnectionId, GestureResult, Session, SessionSummary};
use crate::stats::{AggregateStats, SessionStats};
use dashmap::DashMap;
use gesture_classifier::{math_operation, GestureClassifier, GestureLabel, ModelState, Observation};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug)]
struct Published {
    generation: u64,
    stats: SessionStats,
}

/// Shared entry point for all sessions
pub struct SessionRegistry {
    classifier: Arc<dyn GestureClassifier>,
    config: SessionConfig,
    published: DashMap<ConnectionId, Published>,
    generations: AtomicU64,
    closed: AtomicU64,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("model_state", &self.classifier.model_state())
            .field("config", &self.config)
            .field("active", &self.published.len())
            .finish()
    }
}

impl SessionRegistry {
    /// Create registry around a shared classifier
    #[must_use]
    pub fn new(classifier: Arc<dyn GestureClassifier>, config: SessionConfig) -> Self {
        Self {
            classifier,
            config,
            published: DashMap::new(),
            generations: AtomicU64::new(0),
            closed: AtomicU64::new(0),
        }
    }

    /// Allocate a session; opening an id again replaces its published stats
    /// and detaches the previous session from the registry
    pub fn open(&self, id: ConnectionId) -> Session {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let entry = Published {
            generation,
            stats: SessionStats::default(),
        };
        if self.published.insert(id, entry).is_some() {
            tracing::warn!("Session {} reopened, previous stats replaced", id);
        }
        tracing::debug!("Session {} opened (generation {})", id, generation);
        Session::new(id, &self.config).with_generation(generation)
    }

    /// Classify one observation and record it against the session
    pub fn handle(
        &self,
        session: &mut Session,
        observation: &Observation,
        arrival: Instant,
    ) -> GestureResult {
        let prediction = self.classifier.classify(observation);
        let operation = math_operation(prediction.label);
        let latency = Instant::now().saturating_duration_since(arrival);
        let perf = session.record(&prediction, arrival, latency);

        if let Some(mut entry) = self.published.get_mut(&session.id()) {
            if entry.generation == session.generation() {
                entry.stats.refresh(session, prediction.label);
            }
        }

        if perf.total_gestures % self.config.perf_log_interval.max(1) == 0 {
            tracing::info!(
                "Session {} performance: {:.1} fps, {:.2} ms mean latency, {} gestures",
                session.id(),
                perf.fps,
                session.processing_latency().mean(),
                perf.total_gestures
            );
        }

        GestureResult {
            prediction,
            operation,
            perf,
        }
    }

    /// Record that a result for a frame that arrived at `arrival` was handed
    /// to the connection's outbound queue
    pub fn record_delivery(&self, session: &mut Session, arrival: Instant) {
        session.record_delivery(Instant::now().saturating_duration_since(arrival));
    }

    /// Finish a session; consuming it makes the summary a one-time event.
    /// A session that was replaced by a re-open leaves its successor in place.
    pub fn close(&self, session: Session) -> SessionSummary {
        let summary = session.summary();
        let generation = session.generation();
        if self
            .published
            .remove_if(&session.id(), |_, entry| entry.generation == generation)
            .is_none()
        {
            tracing::debug!("Session {} was replaced before closing", session.id());
        }
        self.closed.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            "Session {} closed after {} ms: {} gestures, {:.2} ms mean latency, {:.1} mean fps",
            session.id(),
            summary.duration_ms,
            summary.total_gestures,
            summary.mean_latency_ms,
            summary.mean_fps
        );
        summary
    }

    /// Live sessions
    #[inline]
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.published.len()
    }

    /// Sessions closed since startup
    #[inline]
    #[must_use]
    pub fn closed_count(&self) -> u64 {
        self.closed.load(Ordering::Relaxed)
    }

    /// Snapshot of one live session
    #[must_use]
    pub fn session_stats(&self, id: ConnectionId) -> Option<SessionStats> {
        self.published.get(&id).map(|e| e.stats.clone())
    }

    /// Figures across all live sessions
    #[must_use]
    pub fn aggregate_stats(&self) -> AggregateStats {
        let snapshots: Vec<SessionStats> = self.published.iter().map(|e| e.stats.clone()).collect();
        AggregateStats::collect(&snapshots)
    }

    #[inline]
    #[must_use]
    pub fn model_state(&self) -> ModelState {
        self.classifier.model_state()
    }

    #[inline]
    #[must_use]
    pub fn supported_gestures(&self) -> Vec<GestureLabel> {
        self.classifier.supported_gestures()
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
