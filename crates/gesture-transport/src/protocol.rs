//! Wire protocol
//!
//! JSON text frames discriminated by `type`.
//!
//! Client to server:
//! - `{"type": "handLandmarks", "landmarks": [{x, y, z} x 21], "metadata": {"frameId", "processingTime"}}`
//! - `{"type": "ping"}`
//!
//! Server to client: `connected`, `gesture_result`, `pong`, `error`; every
//! message carries a millisecond Unix `timestamp`.

use crate::error::DecodeError;
use gesture_classifier::{
    operation_names, GestureLabel, Landmark, Observation, OperationMapping,
};
use gesture_session::{ConnectionId, GestureResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Decoded inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    HandLandmarks {
        observation: Observation,
        /// Echoed back untouched in the result metadata
        frame_id: Option<Value>,
        /// Client-side tracking time in milliseconds, if reported
        client_processing_ms: Option<f64>,
    },
    Ping,
    /// Well-formed message with a `type` this server does not handle
    Unknown(String),
}

#[derive(Deserialize)]
struct HandLandmarksPayload {
    landmarks: Vec<Landmark>,
    #[serde(default)]
    metadata: Option<FrameMetadata>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FrameMetadata {
    #[serde(default)]
    frame_id: Option<Value>,
    #[serde(default)]
    processing_time: Option<f64>,
}

/// Decode one inbound payload
///
/// # Errors
/// - `DecodeError::Malformed` for anything that is not a JSON object with a
///   string `type`, or a `handLandmarks` message without a landmark array
/// - `DecodeError::InvalidObservation` when the landmark count is not 21
pub fn decode(payload: &[u8]) -> Result<ClientMessage, DecodeError> {
    let value: Value = serde_json::from_slice(payload)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::Malformed("missing string field 'type'".to_string()))?
        .to_string();

    match kind.as_str() {
        "handLandmarks" => {
            let payload: HandLandmarksPayload = serde_json::from_value(value)?;
            let metadata = payload.metadata.unwrap_or_default();
            let observation = Observation::try_from(payload.landmarks)?;
            Ok(ClientMessage::HandLandmarks {
                observation,
                frame_id: metadata.frame_id,
                client_processing_ms: metadata.processing_time,
            })
        }
        "ping" => Ok(ClientMessage::Ping),
        _ => Ok(ClientMessage::Unknown(kind)),
    }
}

/// Advertised on connect
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub supported_gestures: Vec<GestureLabel>,
    pub math_operations: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub frame_id: Option<Value>,
    pub timestamp: i64,
}

/// Outbound message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        #[serde(rename = "clientId")]
        client_id: ConnectionId,
        capabilities: Capabilities,
        timestamp: i64,
    },
    GestureResult {
        gesture: GestureLabel,
        confidence: f32,
        probabilities: BTreeMap<GestureLabel, f32>,
        #[serde(rename = "mathOperation")]
        math_operation: Option<&'static OperationMapping>,
        metadata: ResultMetadata,
    },
    Pong {
        timestamp: i64,
    },
    Error {
        message: String,
        timestamp: i64,
    },
}

impl ServerMessage {
    #[must_use]
    pub fn connected(client_id: ConnectionId, supported_gestures: Vec<GestureLabel>) -> Self {
        Self::Connected {
            client_id,
            capabilities: Capabilities {
                supported_gestures,
                math_operations: operation_names(),
            },
            timestamp: now_millis(),
        }
    }

    #[must_use]
    pub fn gesture_result(result: &GestureResult, frame_id: Option<Value>) -> Self {
        Self::GestureResult {
            gesture: result.prediction.label,
            confidence: result.prediction.confidence,
            probabilities: result.prediction.per_class_scores.clone(),
            math_operation: result.operation,
            metadata: ResultMetadata {
                frame_id,
                timestamp: now_millis(),
            },
        }
    }

    #[must_use]
    pub fn pong() -> Self {
        Self::Pong {
            timestamp: now_millis(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            timestamp: now_millis(),
        }
    }

    /// Serialize to a JSON text payload
    ///
    /// # Errors
    /// Returns the serializer error; none of the variants can produce one in
    /// practice.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Milliseconds since the Unix epoch
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use gesture_classifier::LANDMARK_COUNT;
    use serde_json::json;

    fn landmarks(n: usize) -> Value {
        Value::Array((0..n).map(|i| json!({"x": i as f32 / 100.0, "y": 0.5, "z": 0.0})).collect())
    }

    #[test]
    fn decodes_hand_landmarks() {
        let raw = json!({
            "type": "handLandmarks",
            "landmarks": landmarks(LANDMARK_COUNT),
            "metadata": {"frameId": 42, "processingTime": 3.5}
        })
        .to_string();

        match decode(raw.as_bytes()).unwrap() {
            ClientMessage::HandLandmarks {
                observation,
                frame_id,
                client_processing_ms,
            } => {
                assert_eq!(observation.landmarks().len(), LANDMARK_COUNT);
                assert_eq!(frame_id, Some(json!(42)));
                assert_eq!(client_processing_ms, Some(3.5));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn z_defaults_to_zero_and_metadata_is_optional() {
        let lms: Vec<Value> = (0..LANDMARK_COUNT).map(|_| json!({"x": 0.1, "y": 0.2})).collect();
        let raw = json!({"type": "handLandmarks", "landmarks": lms}).to_string();
        assert!(matches!(
            decode(raw.as_bytes()),
            Ok(ClientMessage::HandLandmarks { frame_id: None, .. })
        ));
    }

    #[test]
    fn not_json_is_malformed() {
        let err = decode(b"not-json").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
        assert_eq!(err.client_message(), "Invalid message format");
    }

    #[test]
    fn missing_type_or_landmarks_is_malformed() {
        assert!(matches!(decode(b"{\"x\": 1}"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(b"[1, 2]"), Err(DecodeError::Malformed(_))));
        assert!(matches!(
            decode(br#"{"type": "handLandmarks"}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn wrong_count_is_invalid_observation() {
        let raw = json!({"type": "handLandmarks", "landmarks": landmarks(5)}).to_string();
        let err = decode(raw.as_bytes()).unwrap_err();
        assert_eq!(err.client_message(), "Expected 21 landmarks, received 5");
    }

    #[test]
    fn unknown_type_is_reported() {
        assert_eq!(
            decode(br#"{"type": "subscribe"}"#).unwrap(),
            ClientMessage::Unknown("subscribe".into())
        );
        assert_eq!(decode(br#"{"type": "ping"}"#).unwrap(), ClientMessage::Ping);
    }

    #[test]
    fn error_message_shape() {
        let json: Value = serde_json::from_str(&ServerMessage::error("Invalid message format").encode().unwrap()).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "Invalid message format");
        assert!(json["timestamp"].is_i64());
        assert_eq!(json.as_object().unwrap().len(), 3);
    }

    #[test]
    fn connected_message_shape() {
        let id = ConnectionId::new();
        let msg = ServerMessage::connected(id, vec![GestureLabel::Pinch, GestureLabel::Grab]);
        let json: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "connected");
        assert_eq!(json["clientId"], id.to_string());
        assert_eq!(json["capabilities"]["supportedGestures"], json!(["pinch", "grab"]));
        assert_eq!(json["capabilities"]["mathOperations"][0], "scale");
    }
}
