use gesture_classifier::{ClassifierCascade, GestureLabel, ModelState};
use gesture_session::{ConnectionId, RingBuffer, SessionConfig, SessionRegistry};
use gesture_test_utils::{fist, open_hand, pinch_hand, FixedClassifier};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn rule_registry() -> SessionRegistry {
    SessionRegistry::new(Arc::new(ClassifierCascade::rule_based()), SessionConfig::default())
}

#[test]
fn history_keeps_last_hundred_of_one_fifty() {
    let reg = rule_registry();
    let mut session = reg.open(ConnectionId::new());
    let base = Instant::now();
    let arrivals: Vec<Instant> = (0..150).map(|i| base + Duration::from_millis(i * 10)).collect();

    for arrival in &arrivals {
        reg.handle(&mut session, &open_hand(), *arrival);
    }

    let history = session.history();
    assert_eq!(history.len(), 100);
    assert_eq!(history.oldest().map(|r| r.arrival), Some(arrivals[50]));
    assert_eq!(history.newest().map(|r| r.arrival), Some(arrivals[149]));
    assert_eq!(session.total_gestures(), 150);
    assert_eq!(session.processing_latency().len(), 100);
    assert_eq!(session.fps_samples().len(), 100);
}

#[test]
fn rolling_fps_over_last_thirty() {
    let reg = rule_registry();
    let mut session = reg.open(ConnectionId::new());
    let base = Instant::now();

    for i in 0..60 {
        reg.handle(&mut session, &fist(), base + Duration::from_millis(i * 20));
    }

    // 30 entries spanning 29 intervals of 20 ms.
    let expected = 30.0 / 0.58;
    assert!((session.rolling_fps() - expected).abs() < 1e-6);
}

#[test]
fn summary_is_reported_on_close() {
    let reg = SessionRegistry::new(
        Arc::new(FixedClassifier::new(GestureLabel::Rotate, 0.95)),
        SessionConfig::default(),
    );
    let mut session = reg.open(ConnectionId::new());
    for _ in 0..5 {
        let arrival = Instant::now();
        let result = reg.handle(&mut session, &pinch_hand(), arrival);
        assert_eq!(result.label(), GestureLabel::Rotate);
        assert_eq!(result.operation.map(|op| op.operation), Some("rotate"));
        reg.record_delivery(&mut session, arrival);
    }

    let summary = reg.close(session);
    assert_eq!(summary.total_gestures, 5);
    assert!(summary.mean_latency_ms >= 0.0);
    assert_eq!(reg.closed_count(), 1);
    assert_eq!(reg.active_sessions(), 0);
}

#[test]
fn aggregate_spans_live_sessions() {
    let reg = rule_registry();
    let mut a = reg.open(ConnectionId::new());
    let mut b = reg.open(ConnectionId::new());
    let _idle = reg.open(ConnectionId::new());

    reg.handle(&mut a, &pinch_hand(), Instant::now());
    reg.handle(&mut a, &fist(), Instant::now());
    reg.handle(&mut b, &fist(), Instant::now());

    let agg = reg.aggregate_stats();
    assert_eq!(agg.active_sessions, 3);
    assert_eq!(agg.total_gestures, 3);
    assert_eq!(agg.gesture_distribution.get(&GestureLabel::Grab), Some(&2));
    assert_eq!(agg.gesture_distribution.get(&GestureLabel::Pinch), Some(&1));
    // Session a: (0.9 + 0.75) / 2, session b: 0.75.
    assert!((agg.average_confidence - (0.825 + 0.75) / 2.0).abs() < 1e-6);

    reg.close(a);
    assert_eq!(reg.aggregate_stats().total_gestures, 1);
}

#[test]
fn registry_exposes_classifier_state() {
    let reg = rule_registry();
    assert_eq!(reg.model_state(), ModelState::RuleBasedOnly);
    assert!(reg.supported_gestures().contains(&GestureLabel::Grab));
}

proptest! {
    #[test]
    fn prop_ring_buffer_keeps_newest(cap in 1usize..64, values in prop::collection::vec(any::<u32>(), 0..300)) {
        let mut buf = RingBuffer::new(cap);
        for v in &values {
            buf.push(*v);
        }
        let kept: Vec<u32> = buf.iter().copied().collect();
        let start = values.len().saturating_sub(cap);
        prop_assert_eq!(kept, values[start..].to_vec());
    }

    #[test]
    fn prop_history_is_bounded(n in 0usize..400, cap in 1usize..150) {
        let reg = SessionRegistry::new(
            Arc::new(ClassifierCascade::rule_based()),
            SessionConfig { history_capacity: cap, ..SessionConfig::default() },
        );
        let mut session = reg.open(ConnectionId::new());
        let obs = open_hand();
        for _ in 0..n {
            reg.handle(&mut session, &obs, Instant::now());
        }
        prop_assert_eq!(session.history().len(), n.min(cap));
        prop_assert_eq!(session.total_gestures(), n as u64);
    }
}
