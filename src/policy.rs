// policy.rs — the trained guidance policy behind a narrow seam.
//
// The controller only ever sees `Policy`: a fixed-length observation in, a
// 3-vector of accelerations out. The concrete implementation is the exported
// actor network, stored as a JSON artifact of dense layers. A missing or
// unreadable artifact is fatal at startup; there is nothing sensible to do
// at runtime without a policy.

use ndarray::{Array1, Array2};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

pub const ACTION_LEN: usize = 3;

pub trait Policy: Send {
    /// Run one inference. `observation` length must match the network input.
    fn infer(&self, observation: &[f64]) -> [f64; ACTION_LEN];
}

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("failed to read policy artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse policy artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("policy artifact has no layers")]
    EmptyNetwork,

    #[error("layer {layer}: {reason}")]
    ShapeMismatch { layer: usize, reason: String },
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum Activation {
    Tanh,
    Relu,
    Linear,
}

impl Activation {
    fn apply(&self, mut v: Array1<f64>) -> Array1<f64> {
        match self {
            Activation::Tanh => v.mapv_inplace(f64::tanh),
            Activation::Relu => v.mapv_inplace(|x| x.max(0.0)),
            Activation::Linear => {}
        }
        v
    }
}

#[derive(Deserialize)]
struct LayerSpec {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    activation: Activation,
}

#[derive(Deserialize)]
struct ArtifactSpec {
    layers: Vec<LayerSpec>,
}

struct Layer {
    weights: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

/// Feed-forward actor network evaluated with ndarray matrix-vector products.
pub struct MlpPolicy {
    layers: Vec<Layer>,
    input_len: usize,
}

impl MlpPolicy {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PolicyError> {
        let file = File::open(path)?;
        let spec: ArtifactSpec = serde_json::from_reader(BufReader::new(file))?;
        Self::from_spec(spec)
    }

    pub fn from_json(text: &str) -> Result<Self, PolicyError> {
        let spec: ArtifactSpec = serde_json::from_str(text)?;
        Self::from_spec(spec)
    }

    pub fn input_len(&self) -> usize {
        self.input_len
    }

    fn from_spec(spec: ArtifactSpec) -> Result<Self, PolicyError> {
        if spec.layers.is_empty() {
            return Err(PolicyError::EmptyNetwork);
        }

        let mut layers = Vec::with_capacity(spec.layers.len());
        let mut prev_out = None;
        for (index, layer) in spec.layers.into_iter().enumerate() {
            let rows = layer.weights.len();
            let cols = layer.weights.first().map(|r| r.len()).unwrap_or(0);
            if rows == 0 || cols == 0 {
                return Err(PolicyError::ShapeMismatch {
                    layer: index,
                    reason: "empty weight matrix".into(),
                });
            }
            if layer.weights.iter().any(|r| r.len() != cols) {
                return Err(PolicyError::ShapeMismatch {
                    layer: index,
                    reason: "ragged weight matrix".into(),
                });
            }
            if layer.bias.len() != rows {
                return Err(PolicyError::ShapeMismatch {
                    layer: index,
                    reason: format!("bias length {} != output size {}", layer.bias.len(), rows),
                });
            }
            if let Some(prev) = prev_out {
                if cols != prev {
                    return Err(PolicyError::ShapeMismatch {
                        layer: index,
                        reason: format!("input size {cols} != previous layer output {prev}"),
                    });
                }
            }
            prev_out = Some(rows);

            let flat: Vec<f64> = layer.weights.into_iter().flatten().collect();
            let weights = Array2::from_shape_vec((rows, cols), flat).map_err(|e| {
                PolicyError::ShapeMismatch { layer: index, reason: e.to_string() }
            })?;
            layers.push(Layer {
                weights,
                bias: Array1::from_vec(layer.bias),
                activation: layer.activation,
            });
        }

        let output_len = prev_out.unwrap_or(0);
        if output_len != ACTION_LEN {
            return Err(PolicyError::ShapeMismatch {
                layer: layers.len() - 1,
                reason: format!("final output size {output_len} != action size {ACTION_LEN}"),
            });
        }

        let input_len = layers[0].weights.ncols();
        Ok(MlpPolicy { layers, input_len })
    }
}

impl Policy for MlpPolicy {
    fn infer(&self, observation: &[f64]) -> [f64; ACTION_LEN] {
        let mut activations = Array1::from_vec(observation.to_vec());
        for layer in &self.layers {
            activations = layer.activation.apply(layer.weights.dot(&activations) + &layer.bias);
        }
        [activations[0], activations[1], activations[2]]
    }
}
