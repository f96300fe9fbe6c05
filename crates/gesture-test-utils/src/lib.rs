//! Testing utilities for the gesture gateway workspace
//!
//! Hand fixtures, wire-message builders, and fake classifiers.

#![allow(missing_docs)]

use gesture_classifier::{
    ClassifierTier, ClassifierUnavailable, Finger, GestureClassifier, GestureLabel,
    GesturePrediction, HandLandmark, Landmark, ModelState, Observation, TierKind, LANDMARK_COUNT,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Hand with the chosen non-thumb fingers straight and the rest curled
///
/// Order is index, middle, ring, pinky. The thumb points away from the
/// index tip so no pinch is detected.
pub fn hand_with_fingers(extended: [bool; 4]) -> Observation {
    let mut lms = [Landmark::new(0.5, 0.9, 0.0); LANDMARK_COUNT];

    let thumb = [
        HandLandmark::ThumbCmc,
        HandLandmark::ThumbMcp,
        HandLandmark::ThumbIp,
        HandLandmark::ThumbTip,
    ];
    for (i, joint) in thumb.into_iter().enumerate() {
        lms[joint.index()] = Landmark::new(0.35 - i as f32 * 0.05, 0.82, 0.0);
    }

    for (n, finger) in Finger::ALL.into_iter().enumerate() {
        let x = 0.45 + n as f32 * 0.05;
        let (dip, tip) = if extended[n] {
            (Landmark::new(x, 0.5, 0.0), Landmark::new(x, 0.4, 0.0))
        } else {
            (Landmark::new(x, 0.65, -0.01), Landmark::new(x, 0.69, -0.02))
        };
        lms[finger.mcp().index()] = Landmark::new(x, 0.7, 0.0);
        lms[finger.pip().index()] = Landmark::new(x, 0.6, 0.0);
        lms[finger.pip().index() + 1] = dip;
        lms[finger.tip().index()] = tip;
    }

    Observation::new(lms)
}

pub fn open_hand() -> Observation {
    hand_with_fingers([true; 4])
}

pub fn fist() -> Observation {
    hand_with_fingers([false; 4])
}

pub fn pointing_hand() -> Observation {
    hand_with_fingers([true, false, false, false])
}

/// Thumb tip at (0.50, 0.50, 0) and index tip at (0.52, 0.51, 0)
pub fn pinch_hand() -> Observation {
    open_hand()
        .with_landmark(HandLandmark::ThumbTip, Landmark::new(0.50, 0.50, 0.0))
        .with_landmark(HandLandmark::IndexTip, Landmark::new(0.52, 0.51, 0.0))
}

/// Pointing hand whose thumb tip also touches the index tip
pub fn pinching_pointer() -> Observation {
    let pointing = pointing_hand();
    let tip = *pointing.landmark(HandLandmark::IndexTip);
    pointing.with_landmark(
        HandLandmark::ThumbTip,
        Landmark::new(tip.x + 0.01, tip.y + 0.01, tip.z),
    )
}

/// JSON array of `{x, y, z}` objects
pub fn landmarks_json(observation: &Observation) -> serde_json::Value {
    serde_json::Value::Array(
        observation
            .landmarks()
            .iter()
            .map(|lm| serde_json::json!({"x": lm.x, "y": lm.y, "z": lm.z}))
            .collect(),
    )
}

/// A `handLandmarks` wire message
pub fn hand_landmarks_message(observation: &Observation, frame_id: u64) -> String {
    serde_json::json!({
        "type": "handLandmarks",
        "landmarks": landmarks_json(observation),
        "metadata": {"frameId": frame_id, "processingTime": 4.5},
    })
    .to_string()
}

/// Classifier that always answers the same
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    pub label: GestureLabel,
    pub confidence: f32,
}

impl FixedClassifier {
    pub fn new(label: GestureLabel, confidence: f32) -> Self {
        Self { label, confidence }
    }
}

impl GestureClassifier for FixedClassifier {
    fn classify(&self, _: &Observation) -> GesturePrediction {
        GesturePrediction::single(self.label, self.confidence, TierKind::Primary)
    }

    fn model_state(&self) -> ModelState {
        ModelState::PrimaryLoaded
    }

    fn supported_gestures(&self) -> Vec<GestureLabel> {
        vec![self.label]
    }
}

/// Tier that always fails, counting attempts through a shared counter
#[derive(Debug)]
pub struct FailingTier {
    kind: TierKind,
    attempts: Arc<AtomicUsize>,
}

impl FailingTier {
    pub fn new(kind: TierKind) -> Self {
        Self {
            kind,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter that stays readable after the tier is boxed into a cascade
    pub fn attempts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }
}

impl ClassifierTier for FailingTier {
    fn kind(&self) -> TierKind {
        self.kind
    }

    fn labels(&self) -> Vec<GestureLabel> {
        GestureLabel::ALL.to_vec()
    }

    fn evaluate(&self, _: &Observation) -> Result<GesturePrediction, ClassifierUnavailable> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ClassifierUnavailable::new(self.kind, "forced failure"))
    }
}
