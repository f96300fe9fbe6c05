//! Classifier tiers
//!
//! Each tier returns `Result<GesturePrediction, ClassifierUnavailable>`;
//! the cascade walks tiers in order and only the rule-based tier is
//! guaranteed to succeed.

use crate::error::ClassifierUnavailable;
use crate::features::FeatureVector;
use crate::label::GestureLabel;
use crate::landmark::Observation;
use crate::network::DenseNetwork;
use crate::prediction::GesturePrediction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tier identity, in fallback order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    /// Precompiled artifact
    Primary,
    /// Untrained structural network
    Secondary,
    /// Geometric rules
    #[default]
    RuleBased,
}

impl TierKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TierKind::Primary => "primary",
            TierKind::Secondary => "secondary",
            TierKind::RuleBased => "rule_based",
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classifier implementation in the cascade
pub trait ClassifierTier: Send + Sync + fmt::Debug {
    /// Which tier this is
    fn kind(&self) -> TierKind;

    /// Labels this tier can emit
    fn labels(&self) -> Vec<GestureLabel>;

    /// Classify one observation
    ///
    /// # Errors
    /// Returns `ClassifierUnavailable` when this tier cannot answer this call;
    /// the caller falls back to the next tier.
    fn evaluate(&self, observation: &Observation) -> Result<GesturePrediction, ClassifierUnavailable>;
}

/// Tier backed by a [`DenseNetwork`]
#[derive(Debug, Clone)]
pub struct ModelTier {
    kind: TierKind,
    network: DenseNetwork,
}

impl ModelTier {
    /// Tier for a loaded artifact
    #[must_use]
    pub fn primary(network: DenseNetwork) -> Self {
        Self {
            kind: TierKind::Primary,
            network,
        }
    }

    /// Tier for the structural fallback network
    #[must_use]
    pub fn secondary(network: DenseNetwork) -> Self {
        Self {
            kind: TierKind::Secondary,
            network,
        }
    }

    /// Underlying network
    #[inline]
    #[must_use]
    pub fn network(&self) -> &DenseNetwork {
        &self.network
    }
}

impl ClassifierTier for ModelTier {
    fn kind(&self) -> TierKind {
        self.kind
    }

    fn labels(&self) -> Vec<GestureLabel> {
        self.network.labels().to_vec()
    }

    fn evaluate(&self, observation: &Observation) -> Result<GesturePrediction, ClassifierUnavailable> {
        let features = FeatureVector::from_observation(observation);
        let scores = self
            .network
            .forward(features.as_slice())
            .map_err(|e| ClassifierUnavailable::new(self.kind, e.to_string()))?;

        GesturePrediction::from_scores(self.network.labels(), &scores, self.kind)
            .ok_or_else(|| ClassifierUnavailable::new(self.kind, "output width does not match labels"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_LEN;
    use crate::landmark::{Landmark, LANDMARK_COUNT};
    use crate::network::{Activation, DenseLayer, Layer, ModelArtifact};

    fn biased_network(winner: usize) -> DenseNetwork {
        let labels: Vec<String> = GestureLabel::ALL.iter().map(|l| l.to_string()).collect();
        let mut bias = vec![0.0; labels.len()];
        bias[winner] = 5.0;
        DenseNetwork::from_artifact(ModelArtifact {
            layers: vec![Layer::Dense(DenseLayer {
                weights: vec![vec![0.0; FEATURE_LEN]; labels.len()],
                bias,
                activation: Activation::Softmax,
            })],
            labels,
        })
        .unwrap()
    }

    #[test]
    fn model_tier_reports_all_scores() {
        let tier = ModelTier::primary(biased_network(3));
        let obs = Observation::new([Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT]);

        let p = tier.evaluate(&obs).unwrap();
        assert_eq!(p.label, GestureLabel::Grab);
        assert_eq!(p.tier, TierKind::Primary);
        assert_eq!(p.per_class_scores.len(), GestureLabel::ALL.len());
        assert_eq!(p.per_class_scores[&p.label], p.confidence);
        assert!(p.confidence > 0.9);
    }

    #[test]
    fn tier_kind_display() {
        assert_eq!(TierKind::RuleBased.to_string(), "rule_based");
        assert_eq!(ModelTier::secondary(biased_network(0)).kind(), TierKind::Secondary);
    }
}
