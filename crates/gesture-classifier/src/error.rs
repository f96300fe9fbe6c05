//! Error types for the classifier
//!
//! - [`ObservationError`]: input rejected before classification
//! - [`ClassifierError`]: a model artifact could not be loaded or evaluated
//! - [`ClassifierUnavailable`]: a tier declined a single evaluation

use crate::tier::TierKind;
use std::path::PathBuf;

/// Observation rejected before it reaches any tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ObservationError {
    /// Landmark count differs from the hand model
    #[error("Expected {expected} landmarks, received {found}")]
    WrongLandmarkCount { expected: usize, found: usize },
}

/// Model loading and evaluation errors
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// No artifact at the configured path
    #[error("model artifact not found at {}", path.display())]
    ArtifactMissing { path: PathBuf },

    /// Artifact exists but could not be read
    #[error("io error reading model artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact is not a valid JSON document
    #[error("model artifact is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),

    /// Artifact parsed but describes an unusable network
    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),

    /// Artifact names a label outside the gesture vocabulary
    #[error("unknown gesture label: '{0}'")]
    UnknownLabel(String),

    /// Layer width does not chain with its predecessor
    #[error("layer {layer} shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch {
        layer: usize,
        expected: usize,
        found: usize,
    },

    /// Input vector has the wrong width
    #[error("input has {found} features, expected {expected}")]
    InputLength { expected: usize, found: usize },

    /// Evaluation produced NaN or infinity
    #[error("network produced non-finite output")]
    NonFinite,
}

impl ClassifierError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::ArtifactMissing { path: path.into() };
        }
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the artifact was simply absent (expected on fresh installs)
    #[inline]
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::ArtifactMissing { .. })
    }
}

/// A tier could not produce a prediction for one call
#[derive(Debug, Clone, thiserror::Error)]
#[error("{tier} tier unavailable: {reason}")]
pub struct ClassifierUnavailable {
    /// Tier that failed
    pub tier: TierKind,
    /// Human-readable cause
    pub reason: String,
}

impl ClassifierUnavailable {
    /// Create for tier with reason
    pub fn new(tier: TierKind, reason: impl Into<String>) -> Self {
        Self {
            tier,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_io_maps_to_missing() {
        let err = ClassifierError::io_error(
            "models/absent.json",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.is_missing());
        assert!(err.to_string().contains("models/absent.json"));
    }

    #[test]
    fn permission_error_is_not_missing() {
        let err = ClassifierError::io_error(
            "models/locked.json",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(!err.is_missing());
    }

    #[test]
    fn unavailable_display_names_tier() {
        let err = ClassifierUnavailable::new(TierKind::Primary, "boom");
        assert_eq!(err.to_string(), "primary tier unavailable: boom");
    }
}
