//! Health and stats routes exercised through `warp::test`

use gesture_classifier::{ClassifierCascade, GestureLabel};
use gesture_service::http::{routes, HttpState};
use gesture_session::{ConnectionId, SessionConfig, SessionRegistry};
use gesture_test_utils::{pinch_hand, FixedClassifier};
use gesture_transport::ConnectionHub;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

fn state(registry: &Arc<SessionRegistry>) -> Arc<HttpState> {
    Arc::new(HttpState::new(Arc::clone(registry), Arc::new(ConnectionHub::new())))
}

#[tokio::test]
async fn health_reports_tier_and_connections() {
    let registry = Arc::new(SessionRegistry::new(
        Arc::new(ClassifierCascade::rule_based()),
        SessionConfig::default(),
    ));
    let response = warp::test::request()
        .method("GET")
        .path("/health")
        .reply(&routes(state(&registry)))
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["activeConnections"], 0);
    assert_eq!(body["modelTier"], "rule_based_only");
    assert!(body["uptimeSeconds"].is_u64());
}

#[tokio::test]
async fn stats_aggregate_live_sessions() {
    let registry = Arc::new(SessionRegistry::new(
        Arc::new(FixedClassifier::new(GestureLabel::Rotate, 0.95)),
        SessionConfig::default(),
    ));
    let mut a = registry.open(ConnectionId::new());
    let mut b = registry.open(ConnectionId::new());
    for _ in 0..3 {
        registry.handle(&mut a, &pinch_hand(), Instant::now());
    }
    registry.handle(&mut b, &pinch_hand(), Instant::now());

    let response = warp::test::request()
        .path("/stats")
        .reply(&routes(state(&registry)))
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["totalGestures"], 4);
    assert_eq!(body["activeSessions"], 2);
    assert_eq!(body["gestureDistribution"]["rotate"], 4);
    assert!(body["averageLatencyMs"].is_number());
    assert!(body["averageFps"].is_number());
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let registry = Arc::new(SessionRegistry::new(
        Arc::new(ClassifierCascade::rule_based()),
        SessionConfig::default(),
    ));
    let response = warp::test::request()
        .path("/metrics")
        .reply(&routes(state(&registry)))
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn health_rejects_post() {
    let registry = Arc::new(SessionRegistry::new(
        Arc::new(ClassifierCascade::rule_based()),
        SessionConfig::default(),
    ));
    let response = warp::test::request()
        .method("POST")
        .path("/health")
        .reply(&routes(state(&registry)))
        .await;
    assert_eq!(response.status(), 405);
}
