//! End-to-end tests against both socket backends using a real WebSocket client

use futures::{SinkExt, StreamExt};
use gesture_classifier::ClassifierCascade;
use gesture_session::{SessionConfig, SessionRegistry};
use gesture_test_utils::{hand_landmarks_message, pinch_hand};
use gesture_transport::{
    build_transport, BackendKind, BroadcastEventSink, ConnectionContext, Priority,
    RunningTransport, SendOutcome, ServerMessage, Transport, TransportConfig,
};
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Harness {
    ctx: Arc<ConnectionContext>,
    transport: Arc<dyn Transport>,
    running: RunningTransport,
    events: BroadcastEventSink,
    stop: watch::Sender<bool>,
}

impl Harness {
    async fn start(kind: BackendKind, heartbeat: Duration) -> Self {
        let registry = Arc::new(SessionRegistry::new(
            Arc::new(ClassifierCascade::rule_based()),
            SessionConfig::default(),
        ));
        let events = BroadcastEventSink::new(16);
        let ctx = Arc::new(ConnectionContext::new(
            registry,
            Arc::new(events.clone()),
            TransportConfig {
                heartbeat_interval: heartbeat,
                ..TransportConfig::default()
            },
        ));
        let transport = build_transport(kind, Arc::clone(&ctx));
        let (stop, shutdown) = watch::channel(false);
        let running = transport
            .start("127.0.0.1:0".parse().unwrap(), shutdown)
            .await
            .unwrap();
        Self {
            ctx,
            transport,
            running,
            events,
            stop,
        }
    }

    async fn connect(&self) -> Client {
        let (client, _) = connect_async(format!("ws://{}", self.running.local_addr))
            .await
            .unwrap();
        client
    }

    async fn wait_until(&self, condition: impl Fn(&ConnectionContext) -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition(&self.ctx) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }
}

/// Next JSON message, skipping protocol frames
async fn next_json(client: &mut Client) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn send_text(client: &mut Client, text: impl Into<String>) {
    client.send(Message::Text(text.into())).await.unwrap();
}

#[tokio::test]
async fn connected_message_lists_capabilities() {
    for kind in BackendKind::ALL {
        let harness = Harness::start(kind, Duration::from_secs(30)).await;
        let mut client = harness.connect().await;

        let hello = next_json(&mut client).await;
        assert_eq!(hello["type"], "connected", "{kind}");
        assert!(hello["clientId"].is_string());
        assert_eq!(hello["capabilities"]["mathOperations"][0], "scale");
        assert_eq!(harness.transport.connection_count(), 1);
        assert_eq!(harness.ctx.registry.active_sessions(), 1);
    }
}

#[tokio::test]
async fn invalid_json_gets_error_then_ping_still_works() {
    for kind in BackendKind::ALL {
        let harness = Harness::start(kind, Duration::from_secs(30)).await;
        let mut client = harness.connect().await;
        next_json(&mut client).await;

        send_text(&mut client, "not-json").await;
        let error = next_json(&mut client).await;
        let mut keys: Vec<&str> = error.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["message", "timestamp", "type"]);
        assert_eq!(error["type"], "error");
        assert_eq!(error["message"], "Invalid message format");

        send_text(&mut client, r#"{"type":"ping"}"#).await;
        assert_eq!(next_json(&mut client).await["type"], "pong", "{kind}");
    }
}

#[tokio::test]
async fn pinch_frame_returns_scale_and_publishes_event() {
    for kind in BackendKind::ALL {
        let harness = Harness::start(kind, Duration::from_secs(30)).await;
        let mut events = harness.events.subscribe();
        let mut client = harness.connect().await;
        next_json(&mut client).await;

        send_text(&mut client, hand_landmarks_message(&pinch_hand(), 7)).await;
        let result = next_json(&mut client).await;
        assert_eq!(result["type"], "gesture_result");
        assert_eq!(result["gesture"], "pinch");
        assert_eq!(result["mathOperation"]["operation"], "scale");
        assert_eq!(result["metadata"]["frameId"], 7);

        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.operation.operation, "scale");

        let stats = harness.ctx.registry.aggregate_stats();
        assert_eq!(stats.total_gestures, 1, "{kind}");
    }
}

#[tokio::test]
async fn unknown_message_type_gets_no_reply() {
    for kind in BackendKind::ALL {
        let harness = Harness::start(kind, Duration::from_secs(30)).await;
        let mut client = harness.connect().await;
        next_json(&mut client).await;

        send_text(&mut client, r#"{"type":"calibrate"}"#).await;
        send_text(&mut client, r#"{"type":"ping"}"#).await;
        assert_eq!(next_json(&mut client).await["type"], "pong", "{kind}");
    }
}

#[tokio::test]
async fn wrong_landmark_count_is_reported() {
    for kind in BackendKind::ALL {
        let harness = Harness::start(kind, Duration::from_secs(30)).await;
        let mut client = harness.connect().await;
        next_json(&mut client).await;

        let points: Vec<Value> = (0..5)
            .map(|_| serde_json::json!({"x": 0.5, "y": 0.5, "z": 0.0}))
            .collect();
        let payload = serde_json::json!({"type": "handLandmarks", "landmarks": points});
        send_text(&mut client, payload.to_string()).await;

        let error = next_json(&mut client).await;
        assert_eq!(error["type"], "error");
        assert_eq!(error["message"], "Expected 21 landmarks, received 5", "{kind}");
    }
}

#[tokio::test]
async fn unresponsive_client_is_terminated() {
    for kind in BackendKind::ALL {
        let harness = Harness::start(kind, Duration::from_millis(100)).await;
        // Never polled, so pings are never answered
        let _client = harness.connect().await;
        harness.wait_until(|ctx| ctx.registry.active_sessions() == 1).await;

        let started = std::time::Instant::now();
        harness.wait_until(|ctx| ctx.registry.closed_count() == 1).await;
        assert!(started.elapsed() < Duration::from_secs(1), "{kind}");
        assert_eq!(harness.ctx.registry.active_sessions(), 0);
        assert_eq!(harness.transport.connection_count(), 0);
    }
}

#[tokio::test]
async fn client_close_ends_session() {
    for kind in BackendKind::ALL {
        let harness = Harness::start(kind, Duration::from_secs(30)).await;
        let mut client = harness.connect().await;
        next_json(&mut client).await;

        client.close(None).await.unwrap();
        harness.wait_until(|ctx| ctx.registry.closed_count() == 1).await;
        assert_eq!(harness.ctx.registry.active_sessions(), 0, "{kind}");
    }
}

#[tokio::test]
async fn shutdown_closes_with_going_away() {
    for kind in BackendKind::ALL {
        let harness = Harness::start(kind, Duration::from_secs(30)).await;
        let mut client = harness.connect().await;
        next_json(&mut client).await;

        harness.stop.send(true).unwrap();
        let close = loop {
            match tokio::time::timeout(Duration::from_secs(2), client.next())
                .await
                .unwrap()
            {
                Some(Ok(Message::Close(frame))) => break frame,
                Some(Ok(_)) => continue,
                other => panic!("expected close frame, got {other:?}"),
            }
        };
        let close = close.unwrap();
        assert_eq!(u16::from(close.code), 1001, "{kind}");
        assert_eq!(close.reason, "server shutting down");

        harness.wait_until(|ctx| ctx.registry.closed_count() == 1).await;
        harness.running.join().await;
    }
}

#[tokio::test]
async fn sends_to_a_stalled_client_never_block_and_close_is_delivered() {
    for kind in BackendKind::ALL {
        let harness = Harness::start(kind, Duration::from_secs(30)).await;
        let mut client = harness.connect().await;
        next_json(&mut client).await;
        let id = harness.transport.hub().ids()[0];

        let message = ServerMessage::error("x".repeat(200_000));
        let frame_len = message.encode().unwrap().len();
        let threshold = harness.ctx.config.backpressure_threshold_bytes;

        let started = std::time::Instant::now();
        let outcomes: Vec<SendOutcome> = (0..1_000)
            .map(|_| harness.transport.send(id, &message, Priority::Routine))
            .collect();
        assert!(started.elapsed() < Duration::from_secs(1), "{kind}");

        let dropped = outcomes.iter().filter(|o| **o == SendOutcome::Dropped).count();
        assert!(dropped >= 990, "{kind}: {dropped} dropped");
        assert_eq!(outcomes[0], SendOutcome::Queued);
        let buffered = harness.transport.hub().buffered_bytes(id).unwrap();
        assert!(buffered <= threshold + frame_len, "{kind}: {buffered} bytes buffered");

        assert!(harness.transport.close(id, 1000, "bye"));
        let close = loop {
            match tokio::time::timeout(Duration::from_secs(2), client.next())
                .await
                .unwrap()
            {
                Some(Ok(Message::Close(frame))) => break frame.unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("expected close frame, got {other:?}"),
            }
        };
        assert_eq!(u16::from(close.code), 1000, "{kind}");
        assert_eq!(close.reason, "bye");

        harness.wait_until(|ctx| ctx.registry.closed_count() == 1).await;
        assert_eq!(harness.transport.connection_count(), 0);
        assert!(!harness.transport.close(id, 1000, "bye"));
    }
}
