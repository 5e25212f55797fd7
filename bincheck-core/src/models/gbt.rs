use std::path::Path;

use serde::Deserialize;

use super::{ModelKind, QualityModel, RawEstimate, read_artifact};
use crate::types::BinCheckError;

/// One tree node; splits send `x <= threshold` to `left`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn evaluate(&self, values: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                TreeNode::Leaf { leaf } => return leaf,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => index = if values[feature] <= threshold { left } else { right },
            }
        }
    }

    /// Children must point forward so evaluation always terminates.
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("empty tree".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } = *node
            {
                if feature >= n_features {
                    return Err(format!("node {index} splits on feature {feature}"));
                }
                if !threshold.is_finite() {
                    return Err(format!("node {index} has a non-finite threshold"));
                }
                for child in [left, right] {
                    if child <= index || child >= self.nodes.len() {
                        return Err(format!("node {index} has invalid child {child}"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Additive tree ensemble for one output.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Booster {
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl Booster {
    fn evaluate(&self, values: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|tree| tree.evaluate(values)).sum::<f64>()
    }
}

/// The general model: two boosted ensembles over the full feature vector.
///
/// # Artifact format
///
/// ```json
/// {
///   "schema_version": "1",
///   "n_features": 3,
///   "missing_value": 0.0,
///   "completeness": {"base_score": 50.0, "trees": [{"nodes": [
///       {"feature": 0, "threshold": 0.5, "left": 1, "right": 2},
///       {"leaf": -10.0},
///       {"leaf": 10.0}]}]},
///   "contamination": {"base_score": 1.0, "trees": []}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GradientBoostedModel {
    pub schema_version: String,
    pub n_features: usize,
    #[serde(default)]
    pub missing_value: f64,
    pub completeness: Booster,
    pub contamination: Booster,
}

impl GradientBoostedModel {
    /// Loads and validates `general_model.json`.
    ///
    /// # Errors
    ///
    /// Returns [`BinCheckError::InvalidModel`] for unreadable JSON, an out of
    /// range feature or node index, or a backward child reference.
    pub fn from_path(path: &Path) -> Result<Self, BinCheckError> {
        let model: Self = read_artifact(path)?;
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), BinCheckError> {
        if self.n_features == 0 {
            return Err(BinCheckError::InvalidModel(
                "general model declares no features".to_string(),
            ));
        }
        for (target, booster) in [
            ("completeness", &self.completeness),
            ("contamination", &self.contamination),
        ] {
            for (i, tree) in booster.trees.iter().enumerate() {
                tree.validate(self.n_features).map_err(|e| {
                    BinCheckError::InvalidModel(format!("general model {target} tree {i}: {e}"))
                })?;
            }
        }
        Ok(())
    }
}

impl QualityModel for GradientBoostedModel {
    fn kind(&self) -> ModelKind {
        ModelKind::General
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
        RawEstimate {
            completeness: self.completeness.evaluate(values),
            contamination: self.contamination.evaluate(values),
        }
    }
}
