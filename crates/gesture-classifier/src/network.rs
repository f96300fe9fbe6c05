//! Dense feed-forward network used by the learned tiers
//!
//! Artifacts are JSON documents:
//!
//! ```json
//! {
//!   "labels": ["pinch", "point", "..."],
//!   "layers": [
//!     {"type": "dense", "weights": [[...]], "bias": [...], "activation": "relu"},
//!     {"type": "dropout", "rate": 0.3},
//!     {"type": "dense", "weights": [[...]], "bias": [...], "activation": "softmax"}
//!   ]
//! }
//! ```
//!
//! `weights` is row-major `[output][input]`. Dropout is the identity at
//! inference time and is kept only so artifacts mirror the training graph.

use crate::error::ClassifierError;
use crate::features::FEATURE_LEN;
use crate::label::GestureLabel;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Layer activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Softmax,
}

/// Fully connected layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// `[output][input]`
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn outputs(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut out: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect();

        match self.activation {
            Activation::Linear => {}
            Activation::Relu => out.iter_mut().for_each(|v| *v = v.max(0.0)),
            Activation::Softmax => softmax_in_place(&mut out),
        }
        out
    }
}

/// One step of the network graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Layer {
    Dense(DenseLayer),
    Dropout { rate: f32 },
}

/// Serialized model as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub labels: Vec<String>,
    pub layers: Vec<Layer>,
}

/// Validated, ready-to-evaluate network
#[derive(Debug, Clone)]
pub struct DenseNetwork {
    labels: Vec<GestureLabel>,
    layers: Vec<Layer>,
}

impl DenseNetwork {
    /// Read and validate an artifact from disk
    ///
    /// # Errors
    /// - `ClassifierError::ArtifactMissing` if nothing exists at `path`
    /// - `ClassifierError::Format` / `InvalidArtifact` / `ShapeMismatch` for bad content
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ClassifierError::io_error(path, e))?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)?;
        Self::from_artifact(artifact)
    }

    /// Validate an in-memory artifact
    ///
    /// # Errors
    /// Returns an error when labels are unknown or layer widths do not chain
    /// from [`FEATURE_LEN`] inputs to one softmax output per label.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ClassifierError> {
        if artifact.labels.is_empty() {
            return Err(ClassifierError::InvalidArtifact("no labels".to_string()));
        }
        let labels = artifact
            .labels
            .iter()
            .map(|s| s.parse::<GestureLabel>())
            .collect::<Result<Vec<_>, _>>()?;

        let mut width = FEATURE_LEN;
        let mut last_activation = None;

        for (idx, layer) in artifact.layers.iter().enumerate() {
            match layer {
                Layer::Dense(dense) => {
                    if dense.weights.len() != dense.outputs() {
                        return Err(ClassifierError::ShapeMismatch {
                            layer: idx,
                            expected: dense.outputs(),
                            found: dense.weights.len(),
                        });
                    }
                    if let Some(row) = dense.weights.iter().find(|row| row.len() != width) {
                        return Err(ClassifierError::ShapeMismatch {
                            layer: idx,
                            expected: width,
                            found: row.len(),
                        });
                    }
                    width = dense.outputs();
                    last_activation = Some(dense.activation);
                }
                Layer::Dropout { rate } => {
                    if !(0.0..1.0).contains(rate) {
                        return Err(ClassifierError::InvalidArtifact(format!(
                            "dropout rate {rate} at layer {idx} outside [0, 1)"
                        )));
                    }
                }
            }
        }

        match last_activation {
            None => {
                return Err(ClassifierError::InvalidArtifact(
                    "no dense layers".to_string(),
                ))
            }
            Some(Activation::Softmax) => {}
            Some(_) => {
                return Err(ClassifierError::InvalidArtifact(
                    "final dense layer must use softmax".to_string(),
                ))
            }
        }

        if width != labels.len() {
            return Err(ClassifierError::ShapeMismatch {
                layer: artifact.layers.len() - 1,
                expected: labels.len(),
                found: width,
            });
        }

        Ok(Self {
            labels,
            layers: artifact.layers,
        })
    }

    /// Untrained structural network: dense→dropout→dense→dropout→dense→softmax
    ///
    /// Weights use Xavier-uniform initialisation from a fixed seed so runs
    /// are reproducible. Outputs carry no information until a real model is
    /// loaded.
    #[must_use]
    pub fn structural(labels: &[GestureLabel], seed: u64) -> Self {
        const HIDDEN: [usize; 2] = [128, 64];
        const DROPOUT: f32 = 0.3;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut layers = Vec::with_capacity(5);
        let mut width = FEATURE_LEN;

        for hidden in HIDDEN {
            layers.push(Layer::Dense(xavier_dense(
                &mut rng,
                width,
                hidden,
                Activation::Relu,
            )));
            layers.push(Layer::Dropout { rate: DROPOUT });
            width = hidden;
        }
        layers.push(Layer::Dense(xavier_dense(
            &mut rng,
            width,
            labels.len(),
            Activation::Softmax,
        )));

        Self {
            labels: labels.to_vec(),
            layers,
        }
    }

    /// Output labels, aligned with [`forward`](Self::forward)
    #[inline]
    #[must_use]
    pub fn labels(&self) -> &[GestureLabel] {
        &self.labels
    }

    /// Number of layers including dropout
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Evaluate the network
    ///
    /// # Errors
    /// - `ClassifierError::InputLength` if `input` is not [`FEATURE_LEN`] wide
    /// - `ClassifierError::NonFinite` if any output is NaN or infinite
    pub fn forward(&self, input: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        if input.len() != FEATURE_LEN {
            return Err(ClassifierError::InputLength {
                expected: FEATURE_LEN,
                found: input.len(),
            });
        }

        let mut activations = input.to_vec();
        for layer in &self.layers {
            if let Layer::Dense(dense) = layer {
                activations = dense.forward(&activations);
            }
        }

        if activations.iter().any(|v| !v.is_finite()) {
            return Err(ClassifierError::NonFinite);
        }
        Ok(activations)
    }
}

fn xavier_dense(rng: &mut StdRng, inputs: usize, outputs: usize, activation: Activation) -> DenseLayer {
    let limit = (6.0 / (inputs + outputs) as f32).sqrt();
    DenseLayer {
        weights: (0..outputs)
            .map(|_| (0..inputs).map(|_| rng.gen_range(-limit..limit)).collect())
            .collect(),
        bias: vec![0.0; outputs],
        activation,
    }
}

fn softmax_in_place(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    // A zero or NaN sum propagates as non-finite and is rejected by `forward`.
    for v in values.iter_mut() {
        *v /= sum;
    }
}
