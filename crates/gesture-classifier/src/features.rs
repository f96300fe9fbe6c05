//! Feature extraction for the learned tiers
//!
//! Every landmark is expressed relative to the wrist and flattened as
//! `[x0, y0, z0, x1, y1, z1, ...]`, which makes the vector independent of
//! where the hand sits in the frame.

use crate::landmark::{HandLandmark, Observation, LANDMARK_COUNT};

/// Width of the feature vector (21 landmarks x 3 axes)
pub const FEATURE_LEN: usize = LANDMARK_COUNT * 3;

/// Wrist-relative flattened landmarks
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector([f32; FEATURE_LEN]);

impl FeatureVector {
    /// Extract features from an observation
    #[must_use]
    pub fn from_observation(observation: &Observation) -> Self {
        let wrist = observation.landmark(HandLandmark::Wrist);
        let mut values = [0.0_f32; FEATURE_LEN];

        for (i, lm) in observation.landmarks().iter().enumerate() {
            let rel = lm.relative_to(wrist);
            values[i * 3] = rel.x;
            values[i * 3 + 1] = rel.y;
            values[i * 3 + 2] = rel.z;
        }

        Self(values)
    }

    /// Features as a slice
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Always [`FEATURE_LEN`]
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never empty; present for API symmetry with slices
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl AsRef<[f32]> for FeatureVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}
