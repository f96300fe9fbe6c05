//! Classifier output

use crate::label::GestureLabel;
use crate::tier::TierKind;
use serde::Serialize;
use std::collections::BTreeMap;

/// A gesture prediction from one tier
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GesturePrediction {
    /// Winning label
    pub label: GestureLabel,
    /// Score of the winning label, in `[0, 1]`
    pub confidence: f32,
    /// Score per label; only the winner for rule-based predictions
    pub per_class_scores: BTreeMap<GestureLabel, f32>,
    /// Tier that produced this prediction
    #[serde(skip)]
    pub tier: TierKind,
}

impl GesturePrediction {
    /// Prediction carrying a single score (rule-based shape)
    #[must_use]
    pub fn single(label: GestureLabel, confidence: f32, tier: TierKind) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        Self {
            label,
            confidence,
            per_class_scores: BTreeMap::from([(label, confidence)]),
            tier,
        }
    }

    /// Arg-max prediction over a probability vector aligned with `labels`
    ///
    /// Returns `None` when the inputs are empty or misaligned.
    #[must_use]
    pub fn from_scores(labels: &[GestureLabel], scores: &[f32], tier: TierKind) -> Option<Self> {
        if labels.is_empty() || labels.len() != scores.len() {
            return None;
        }

        let (best, &confidence) = scores
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))?;

        Some(Self {
            label: labels[best],
            confidence,
            per_class_scores: labels.iter().copied().zip(scores.iter().copied()).collect(),
            tier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_holds_only_winner() {
        let p = GesturePrediction::single(GestureLabel::Grab, 0.75, TierKind::RuleBased);
        assert_eq!(p.per_class_scores.len(), 1);
        assert_eq!(p.per_class_scores[&GestureLabel::Grab], 0.75);
    }

    #[test]
    fn from_scores_takes_argmax() {
        let labels = [GestureLabel::Pinch, GestureLabel::Point, GestureLabel::Unknown];
        let p = GesturePrediction::from_scores(&labels, &[0.2, 0.7, 0.1], TierKind::Primary)
            .unwrap();
        assert_eq!(p.label, GestureLabel::Point);
        assert_eq!(p.confidence, 0.7);
        assert_eq!(p.per_class_scores[&p.label], p.confidence);
        assert_eq!(p.per_class_scores.len(), 3);
    }

    #[test]
    fn from_scores_rejects_misaligned_input() {
        let labels = [GestureLabel::Pinch];
        assert!(GesturePrediction::from_scores(&labels, &[0.5, 0.5], TierKind::Primary).is_none());
        assert!(GesturePrediction::from_scores(&[], &[], TierKind::Primary).is_none());
    }
}
