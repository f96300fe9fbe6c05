//! Rule-based tier
//!
//! Interpretable geometric checks evaluated in a fixed order; the first
//! matching rule wins and no scores are blended.

use crate::error::ClassifierUnavailable;
use crate::label::GestureLabel;
use crate::landmark::{Finger, HandLandmark, Observation};
use crate::prediction::GesturePrediction;
use crate::tier::{ClassifierTier, TierKind};

/// Thumb-tip to index-tip distance below which the hand is pinching
pub const PINCH_DISTANCE: f32 = 0.05;

/// A finger is extended when tip-to-MCP exceeds this share of its bent length
pub const EXTENSION_RATIO: f32 = 0.8;

const PINCH_CONFIDENCE: f32 = 0.9;
const POINT_CONFIDENCE: f32 = 0.85;
const SPREAD_CONFIDENCE: f32 = 0.8;
const GRAB_CONFIDENCE: f32 = 0.75;
const UNKNOWN_CONFIDENCE: f32 = 0.3;

/// Always-available geometric classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleTier;

impl RuleTier {
    /// Labels the rules can produce
    pub const LABELS: [GestureLabel; 5] = [
        GestureLabel::Pinch,
        GestureLabel::Point,
        GestureLabel::Spread,
        GestureLabel::Grab,
        GestureLabel::Unknown,
    ];

    /// Classify; never fails
    #[must_use]
    pub fn classify(&self, observation: &Observation) -> GesturePrediction {
        let (label, confidence) = Self::decide(observation);
        GesturePrediction::single(label, confidence, TierKind::RuleBased)
    }

    fn decide(observation: &Observation) -> (GestureLabel, f32) {
        if observation.distance(HandLandmark::ThumbTip, HandLandmark::IndexTip) < PINCH_DISTANCE {
            return (GestureLabel::Pinch, PINCH_CONFIDENCE);
        }

        let [index, middle, ring, pinky] = Finger::ALL.map(|f| is_finger_extended(observation, f));

        if index && !middle && !ring && !pinky {
            (GestureLabel::Point, POINT_CONFIDENCE)
        } else if index && middle && ring && pinky {
            (GestureLabel::Spread, SPREAD_CONFIDENCE)
        } else if !index && !middle && !ring && !pinky {
            (GestureLabel::Grab, GRAB_CONFIDENCE)
        } else {
            (GestureLabel::Unknown, UNKNOWN_CONFIDENCE)
        }
    }
}

impl ClassifierTier for RuleTier {
    fn kind(&self) -> TierKind {
        TierKind::RuleBased
    }

    fn labels(&self) -> Vec<GestureLabel> {
        Self::LABELS.to_vec()
    }

    fn evaluate(&self, observation: &Observation) -> Result<GesturePrediction, ClassifierUnavailable> {
        Ok(self.classify(observation))
    }
}

/// Whether a finger is straight: its tip lies nearly as far from the MCP as
/// the sum of its two segments
#[must_use]
pub fn is_finger_extended(observation: &Observation, finger: Finger) -> bool {
    let tip_to_mcp = observation.distance(finger.tip(), finger.mcp());
    let tip_to_pip = observation.distance(finger.tip(), finger.pip());
    let pip_to_mcp = observation.distance(finger.pip(), finger.mcp());
    tip_to_mcp > EXTENSION_RATIO * (tip_to_pip + pip_to_mcp)
}
