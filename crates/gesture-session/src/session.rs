//! Per-connection session state

use crate::config::SessionConfig;
use crate::ring_buffer::RingBuffer;
use gesture_classifier::{GestureLabel, GesturePrediction, OperationMapping};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Unique connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Generate new connection ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One classified observation in the history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureRecord {
    pub label: GestureLabel,
    pub confidence: f32,
    pub arrival: Instant,
}

/// Performance figures attached to each result
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfSnapshot {
    /// Arrival to prediction for this observation
    pub latency_ms: f64,
    /// Rolling frames per second over the FPS window
    pub fps: f64,
    pub total_gestures: u64,
}

/// Output of one `handle` call
#[derive(Debug, Clone)]
pub struct GestureResult {
    pub prediction: GesturePrediction,
    pub operation: Option<&'static OperationMapping>,
    pub perf: PerfSnapshot,
}

impl GestureResult {
    #[inline]
    #[must_use]
    pub fn label(&self) -> GestureLabel {
        self.prediction.label
    }

    #[inline]
    #[must_use]
    pub fn confidence(&self) -> f32 {
        self.prediction.confidence
    }
}

/// Final figures for a closed session
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub duration_ms: u64,
    pub total_gestures: u64,
    pub mean_latency_ms: f64,
    pub mean_fps: f64,
}

/// Mutable state owned by the task driving one connection
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    generation: u64,
    started_at: Instant,
    history: RingBuffer<GestureRecord>,
    processing_latency: RingBuffer<f64>,
    end_to_end_latency: RingBuffer<f64>,
    fps_samples: RingBuffer<f64>,
    fps_window: usize,
    total_gestures: u64,
    confidence_sum: f64,
    distribution: BTreeMap<GestureLabel, u64>,
}

impl Session {
    /// Fresh session sized by `config`
    #[must_use]
    pub fn new(id: ConnectionId, config: &SessionConfig) -> Self {
        Self {
            id,
            generation: 0,
            started_at: Instant::now(),
            history: RingBuffer::new(config.history_capacity),
            processing_latency: RingBuffer::new(config.sample_capacity),
            end_to_end_latency: RingBuffer::new(config.sample_capacity),
            fps_samples: RingBuffer::new(config.sample_capacity),
            fps_window: config.fps_window.max(1),
            total_gestures: 0,
            confidence_sum: 0.0,
            distribution: BTreeMap::new(),
        }
    }

    /// Tag the session with the registry slot it was opened into
    #[must_use]
    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    #[inline]
    #[must_use]
    pub fn history(&self) -> &RingBuffer<GestureRecord> {
        &self.history
    }

    #[inline]
    #[must_use]
    pub fn processing_latency(&self) -> &RingBuffer<f64> {
        &self.processing_latency
    }

    #[inline]
    #[must_use]
    pub fn end_to_end_latency(&self) -> &RingBuffer<f64> {
        &self.end_to_end_latency
    }

    #[inline]
    #[must_use]
    pub fn fps_samples(&self) -> &RingBuffer<f64> {
        &self.fps_samples
    }

    /// Gestures handled over the whole session, not just those retained
    #[inline]
    #[must_use]
    pub fn total_gestures(&self) -> u64 {
        self.total_gestures
    }

    #[inline]
    #[must_use]
    pub fn distribution(&self) -> &BTreeMap<GestureLabel, u64> {
        &self.distribution
    }

    /// Mean confidence over every gesture handled
    #[must_use]
    pub fn mean_confidence(&self) -> f64 {
        if self.total_gestures == 0 {
            return 0.0;
        }
        self.confidence_sum / self.total_gestures as f64
    }

    /// Record one classification and return the refreshed performance figures
    pub(crate) fn record(
        &mut self,
        prediction: &GesturePrediction,
        arrival: Instant,
        latency: Duration,
    ) -> PerfSnapshot {
        self.history.push(GestureRecord {
            label: prediction.label,
            confidence: prediction.confidence,
            arrival,
        });
        self.total_gestures += 1;
        self.confidence_sum += f64::from(prediction.confidence);
        *self.distribution.entry(prediction.label).or_insert(0) += 1;

        let latency_ms = millis(latency);
        self.processing_latency.push(latency_ms);

        let fps = self.rolling_fps();
        self.fps_samples.push(fps);

        PerfSnapshot {
            latency_ms,
            fps,
            total_gestures: self.total_gestures,
        }
    }

    pub(crate) fn record_delivery(&mut self, elapsed: Duration) {
        self.end_to_end_latency.push(millis(elapsed));
    }

    /// Entries per second across the last `fps_window` history entries
    ///
    /// Zero with fewer than two entries or when they share one instant.
    #[must_use]
    pub fn rolling_fps(&self) -> f64 {
        let count = self.history.len().min(self.fps_window);
        if count < 2 {
            return 0.0;
        }
        let (Some(first), Some(last)) = (self.history.last_n(count).next(), self.history.newest())
        else {
            return 0.0;
        };
        let span = last.arrival.saturating_duration_since(first.arrival).as_secs_f64();
        if span <= 0.0 {
            return 0.0;
        }
        count as f64 / span
    }

    /// Summary as of now
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            duration_ms: u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            total_gestures: self.total_gestures,
            mean_latency_ms: self.processing_latency.mean(),
            mean_fps: self.fps_samples.mean(),
        }
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
