//! Gesture Classifier - tiered hand-pose classification
//!
//! Turns a 21-point hand observation into a [`GesturePrediction`]:
//! - Primary tier: a precompiled dense network loaded from a JSON artifact
//! - Secondary tier: an untrained in-process network of the same shape
//! - Rule-based tier: geometric checks on raw landmarks, always available
//!
//! The [`ClassifierCascade`] selects the active tier once at startup and
//! degrades one tier per call when a model evaluation fails.
//!
//! # Example
//!
//! ```rust,ignore
//! use gesture_classifier::{CascadeConfig, ClassifierCascade, GestureClassifier, math_operation};
//!
//! let cascade = ClassifierCascade::initialize(&CascadeConfig::default());
//! let prediction = cascade.classify(&observation);
//! let operation = math_operation(prediction.label);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cascade;
pub mod error;
pub mod features;
pub mod label;
pub mod landmark;
pub mod network;
pub mod operation;
pub mod prediction;
pub mod rules;
pub mod tier;

pub use cascade::{CascadeConfig, ClassifierCascade, GestureClassifier, ModelState};
pub use error::{ClassifierError, ClassifierUnavailable, ObservationError};
pub use features::{FeatureVector, FEATURE_LEN};
pub use label::GestureLabel;
pub use landmark::{Finger, HandLandmark, Landmark, Observation, LANDMARK_COUNT};
pub use network::{Activation, DenseLayer, DenseNetwork, Layer, ModelArtifact};
pub use operation::{math_operation, operation_names, OperationMapping, OPERATION_TABLE};
pub use prediction::GesturePrediction;
pub use rules::RuleTier;
pub use tier::{ClassifierTier, ModelTier, TierKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
