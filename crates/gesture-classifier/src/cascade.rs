//! Classifier cascade
//!
//! Selects the active tier once at startup (primary artifact, then the
//! optional structural network, then rules) and evaluates each call by
//! walking from the active tier downwards. A failing tier only affects the
//! call in which it failed.

use crate::label::GestureLabel;
use crate::landmark::Observation;
use crate::network::DenseNetwork;
use crate::prediction::GesturePrediction;
use crate::rules::RuleTier;
use crate::tier::{ClassifierTier, ModelTier, TierKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Process-wide model state, fixed after initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    #[default]
    Uninitialized,
    PrimaryLoaded,
    SecondaryLoaded,
    RuleBasedOnly,
}

impl ModelState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ModelState::Uninitialized => "uninitialized",
            ModelState::PrimaryLoaded => "primary_loaded",
            ModelState::SecondaryLoaded => "secondary_loaded",
            ModelState::RuleBasedOnly => "rule_based_only",
        }
    }

    /// Tier that answers first, if initialized
    #[must_use]
    pub const fn active_tier(self) -> Option<TierKind> {
        match self {
            ModelState::Uninitialized => None,
            ModelState::PrimaryLoaded => Some(TierKind::Primary),
            ModelState::SecondaryLoaded => Some(TierKind::Secondary),
            ModelState::RuleBasedOnly => Some(TierKind::RuleBased),
        }
    }

    fn from_tier(kind: Option<TierKind>) -> Self {
        match kind {
            Some(TierKind::Primary) => ModelState::PrimaryLoaded,
            Some(TierKind::Secondary) => ModelState::SecondaryLoaded,
            Some(TierKind::RuleBased) | None => ModelState::RuleBasedOnly,
        }
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cascade initialization settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Path of the primary-tier artifact
    pub model_path: PathBuf,
    /// Build the untrained structural network as a second tier
    pub enable_structural_fallback: bool,
    /// Seed for the structural network's weights
    pub structural_seed: u64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/gesture_classifier.json"),
            enable_structural_fallback: false,
            structural_seed: 42,
        }
    }
}

/// Classification seam used by sessions; lets tests substitute fakes
pub trait GestureClassifier: Send + Sync {
    /// Classify one observation; never fails
    fn classify(&self, observation: &Observation) -> GesturePrediction;

    /// Which tier is active
    fn model_state(&self) -> ModelState;

    /// Labels advertised to clients
    fn supported_gestures(&self) -> Vec<GestureLabel>;
}

/// Ordered tiers with a guaranteed rule-based floor
#[derive(Debug)]
pub struct ClassifierCascade {
    tiers: Vec<Box<dyn ClassifierTier>>,
    rules: RuleTier,
    state: ModelState,
}

impl ClassifierCascade {
    /// Run tier selection
    ///
    /// Never fails: a missing or invalid artifact is logged and the cascade
    /// falls through to the next tier.
    #[must_use]
    pub fn initialize(config: &CascadeConfig) -> Self {
        let mut tiers: Vec<Box<dyn ClassifierTier>> = Vec::new();

        match DenseNetwork::load(&config.model_path) {
            Ok(network) => {
                tracing::info!(
                    "Loaded primary model from {} ({} labels, {} layers)",
                    config.model_path.display(),
                    network.labels().len(),
                    network.depth()
                );
                tiers.push(Box::new(ModelTier::primary(network)));
            }
            Err(e) if e.is_missing() => {
                tracing::info!("No primary model artifact: {}", e);
            }
            Err(e) => {
                tracing::warn!("Primary model unusable, falling through: {}", e);
            }
        }

        if config.enable_structural_fallback {
            let network = DenseNetwork::structural(&GestureLabel::ALL, config.structural_seed);
            tiers.push(Box::new(ModelTier::secondary(network)));
        }

        let cascade = Self::with_tiers(tiers);
        tracing::info!("Classifier initialized: {}", cascade.state);
        cascade
    }

    /// Rules only
    #[must_use]
    pub fn rule_based() -> Self {
        Self::with_tiers(Vec::new())
    }

    /// Cascade over explicit tiers, highest priority first
    ///
    /// The rule tier is always appended as the floor; the model state
    /// reflects the first tier given.
    #[must_use]
    pub fn with_tiers(tiers: Vec<Box<dyn ClassifierTier>>) -> Self {
        let state = ModelState::from_tier(tiers.first().map(|t| t.kind()));
        Self {
            tiers,
            rules: RuleTier,
            state,
        }
    }

    /// Tier that answers first
    #[inline]
    #[must_use]
    pub fn active_tier(&self) -> TierKind {
        self.tiers.first().map_or(TierKind::RuleBased, |t| t.kind())
    }
}

impl GestureClassifier for ClassifierCascade {
    fn classify(&self, observation: &Observation) -> GesturePrediction {
        for tier in &self.tiers {
            match tier.evaluate(observation) {
                Ok(prediction) => return prediction,
                Err(e) => tracing::warn!("Falling back one tier: {}", e),
            }
        }
        self.rules.classify(observation)
    }

    fn model_state(&self) -> ModelState {
        self.state
    }

    fn supported_gestures(&self) -> Vec<GestureLabel> {
        self.tiers
            .first()
            .map_or_else(|| self.rules.labels(), |t| t.labels())
    }
}
