//! Published statistics
//!
//! - [`SessionStats`]: snapshot of one live session, refreshed on every gesture
//! - [`AggregateStats`]: figures across all live sessions for `GET /stats`

use crate::session::Session;
use gesture_classifier::GestureLabel;
use serde::Serialize;
use std::collections::BTreeMap;

/// Read-only view of one session
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_gestures: u64,
    pub mean_latency_ms: f64,
    pub mean_fps: f64,
    pub mean_confidence: f64,
    pub distribution: BTreeMap<GestureLabel, u64>,
}

impl SessionStats {
    /// Refresh from the owning session after a gesture
    pub(crate) fn refresh(&mut self, session: &Session, label: GestureLabel) {
        self.total_gestures = session.total_gestures();
        self.mean_latency_ms = session.processing_latency().mean();
        self.mean_fps = session.fps_samples().mean();
        self.mean_confidence = session.mean_confidence();
        *self.distribution.entry(label).or_insert(0) += 1;
    }
}

/// Figures across every live session
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    /// Mean of per-session mean processing latency
    pub average_latency_ms: f64,
    /// Mean of per-session mean FPS
    pub average_fps: f64,
    pub gesture_distribution: BTreeMap<GestureLabel, u64>,
    pub total_gestures: u64,
    /// Mean of per-session mean confidence
    pub average_confidence: f64,
    pub active_sessions: usize,
}

impl AggregateStats {
    /// Combine session snapshots; sessions without gestures count toward
    /// `active_sessions` only
    pub fn collect<'a>(sessions: impl IntoIterator<Item = &'a SessionStats>) -> Self {
        let mut out = Self::default();
        let mut reporting = 0usize;

        for stats in sessions {
            out.active_sessions += 1;
            if stats.total_gestures == 0 {
                continue;
            }
            reporting += 1;
            out.total_gestures += stats.total_gestures;
            out.average_latency_ms += stats.mean_latency_ms;
            out.average_fps += stats.mean_fps;
            out.average_confidence += stats.mean_confidence;
            for (label, count) in &stats.distribution {
                *out.gesture_distribution.entry(*label).or_insert(0) += count;
            }
        }

        if reporting > 0 {
            let n = reporting as f64;
            out.average_latency_ms /= n;
            out.average_fps /= n;
            out.average_confidence /= n;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(total: u64, latency: f64, label: GestureLabel) -> SessionStats {
        SessionStats {
            total_gestures: total,
            mean_latency_ms: latency,
            mean_fps: 20.0,
            mean_confidence: 0.8,
            distribution: BTreeMap::from([(label, total)]),
        }
    }

    #[test]
    fn averages_only_sessions_with_gestures() {
        let all = [
            stats(4, 2.0, GestureLabel::Pinch),
            stats(6, 4.0, GestureLabel::Pinch),
            SessionStats::default(),
        ];
        let agg = AggregateStats::collect(&all);

        assert_eq!(agg.active_sessions, 3);
        assert_eq!(agg.total_gestures, 10);
        assert_eq!(agg.average_latency_ms, 3.0);
        assert_eq!(agg.gesture_distribution[&GestureLabel::Pinch], 10);
    }

    #[test]
    fn empty_is_all_zero() {
        let agg = AggregateStats::collect(&[]);
        assert_eq!(agg, AggregateStats::default());
    }

    #[test]
    fn serializes_camel_case() {
        let agg = AggregateStats::collect(&[stats(1, 1.0, GestureLabel::Grab)]);
        let json = serde_json::to_value(&agg).unwrap();
        assert_eq!(json["averageLatencyMs"], 1.0);
        assert_eq!(json["gestureDistribution"]["grab"], 1);
        assert_eq!(json["activeSessions"], 1);
    }
}
