use std::path::Path;

use serde::Deserialize;

use super::{ModelKind, QualityModel, RawEstimate, read_artifact};
use crate::types::BinCheckError;

fn default_output_scale() -> f64 {
    100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
    Linear,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Self::Relu => x.max(0.0),
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Self::Tanh => x.tanh(),
            Self::Linear => x,
        }
    }
}

/// Standardisation applied before the first layer: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Dense layer; `weights[j]` holds the input weights of output unit `j`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Layer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

impl Layer {
    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| {
                let sum: f64 = row.iter().zip(input).map(|(w, x)| w * x).sum();
                self.activation.apply(sum + bias)
            })
            .collect()
    }
}

/// The specific model: a small feed-forward network.
///
/// The final layer has two units (completeness, contamination) whose
/// values are multiplied by `output_scale` to give percentages.
/// `min_cosine_similarity` is the lower edge of the composition range the
/// network was trained on and drives automatic model selection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NeuralModel {
    pub schema_version: String,
    pub n_features: usize,
    #[serde(default)]
    pub missing_value: f64,
    pub scaler: Scaler,
    pub layers: Vec<Layer>,
    #[serde(default = "default_output_scale")]
    pub output_scale: f64,
    #[serde(default)]
    pub min_cosine_similarity: Option<f64>,
}

impl NeuralModel {
    /// Loads and validates `specific_model.json`.
    ///
    /// # Errors
    ///
    /// Returns [`BinCheckError::InvalidModel`] for unreadable JSON or
    /// inconsistent layer shapes.
    pub fn from_path(path: &Path) -> Result<Self, BinCheckError> {
        let model: Self = read_artifact(path)?;
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), BinCheckError> {
        let invalid = |message: String| BinCheckError::InvalidModel(format!("specific model: {message}"));

        if self.n_features == 0 {
            return Err(invalid("declares no features".to_string()));
        }
        if self.scaler.mean.len() != self.n_features || self.scaler.scale.len() != self.n_features {
            return Err(invalid("scaler length differs from n_features".to_string()));
        }
        if self.scaler.scale.iter().any(|&s| s == 0.0 || !s.is_finite()) {
            return Err(invalid("scaler has a zero or non-finite scale".to_string()));
        }
        if self.layers.is_empty() {
            return Err(invalid("no layers".to_string()));
        }

        let mut width = self.n_features;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.weights.is_empty() || layer.weights.len() != layer.bias.len() {
                return Err(invalid(format!("layer {i} weights and bias disagree")));
            }
            if layer.weights.iter().any(|row| row.len() != width) {
                return Err(invalid(format!("layer {i} expects {width} inputs")));
            }
            width = layer.weights.len();
        }
        if width != 2 {
            return Err(invalid(format!("final layer has {width} outputs, expected 2")));
        }
        if let Some(threshold) = self.min_cosine_similarity
            && !(-1.0..=1.0).contains(&threshold)
        {
            return Err(invalid(format!("min_cosine_similarity {threshold} outside [-1, 1]")));
        }
        Ok(())
    }
}

impl QualityModel for NeuralModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Specific
    }

    fn schema_version(&self) -> &str {
        &self.schema_version
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn missing_value(&self) -> f64 {
        self.missing_value
    }

    fn evaluate(&self, values: &[f64]) -> RawEstimate {
        let mut activations: Vec<f64> = values
            .iter()
            .zip(self.scaler.mean.iter().zip(&self.scaler.scale))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect();
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }
        RawEstimate {
            completeness: activations.first().copied().unwrap_or(f64::NAN) * self.output_scale,
            contamination: activations.get(1).copied().unwrap_or(f64::NAN) * self.output_scale,
        }
    }
}
