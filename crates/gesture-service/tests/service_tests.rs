//! Whole-service lifecycle over real sockets

use futures::{SinkExt, StreamExt};
use gesture_classifier::GestureLabel;
use gesture_service::{GestureService, ServiceConfig, ServiceError};
use gesture_test_utils::{hand_landmarks_message, pinch_hand, FixedClassifier};
use gesture_transport::BackendKind;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

fn local_config(backend: BackendKind) -> ServiceConfig {
    ServiceConfig {
        ws_port: 0,
        http_port: 0,
        bind_host: Ipv4Addr::LOCALHOST.into(),
        backend,
        heartbeat_interval_ms: 1_000,
        ..ServiceConfig::default()
    }
}

async fn http_get(addr: SocketAddr, path: &str) -> Value {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("HTTP/1.1 200"), "{head}");
    serde_json::from_str(body).unwrap()
}

#[tokio::test]
async fn serves_gestures_health_and_shuts_down() {
    for backend in BackendKind::ALL {
        let service = GestureService::with_classifier(
            local_config(backend),
            Arc::new(FixedClassifier::new(GestureLabel::Pinch, 0.97)),
        )
        .unwrap();
        let mut events = service.events().subscribe();
        let running = service.start().await.unwrap();

        let (mut client, _) = connect_async(format!("ws://{}", running.ws_addr)).await.unwrap();
        let hello = client.next().await.unwrap().unwrap();
        assert!(hello.to_text().unwrap().contains("\"connected\""));

        client
            .send(Message::Text(hand_landmarks_message(&pinch_hand(), 1)))
            .await
            .unwrap();
        let reply: Value = serde_json::from_str(client.next().await.unwrap().unwrap().to_text().unwrap()).unwrap();
        assert_eq!(reply["gesture"], "pinch");
        assert_eq!(reply["mathOperation"]["operation"], "scale");

        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.gesture, GestureLabel::Pinch);

        let health = http_get(running.http_addr, "/health").await;
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["activeConnections"], 1);
        assert_eq!(health["modelTier"], "primary_loaded");

        let stats = http_get(running.http_addr, "/stats").await;
        assert_eq!(stats["totalGestures"], 1);

        service.shutdown();
        let close = loop {
            match client.next().await {
                Some(Ok(Message::Close(frame))) => break frame.unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("expected close frame, got {other:?}"),
            }
        };
        assert_eq!(u16::from(close.code), 1001, "{backend}");

        tokio::time::timeout(Duration::from_secs(2), running.wait())
            .await
            .unwrap();
        assert!(matches!(service.start().await, Err(ServiceError::ShutDown)));
    }
}

#[tokio::test]
async fn occupied_port_fails_to_start() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = ServiceConfig {
        ws_port: taken.local_addr().unwrap().port(),
        ..local_config(BackendKind::Tungstenite)
    };
    let service = GestureService::with_classifier(
        config,
        Arc::new(FixedClassifier::new(GestureLabel::Point, 0.9)),
    )
    .unwrap();

    let err = service.start().await.unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, ServiceError::Transport(_)));
}

#[tokio::test]
async fn run_until_stops_on_signal() {
    let service = GestureService::with_classifier(
        local_config(BackendKind::Warp),
        Arc::new(FixedClassifier::new(GestureLabel::Point, 0.9)),
    )
    .unwrap();

    tokio::time::timeout(
        Duration::from_secs(3),
        service.run_until(tokio::time::sleep(Duration::from_millis(50))),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(service.is_shutting_down());
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let config = ServiceConfig {
        heartbeat_interval_ms: 1,
        ..ServiceConfig::default()
    };
    assert!(matches!(GestureService::new(config), Err(ServiceError::Config(_))));
}
