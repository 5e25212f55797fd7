//! Quality prediction models.
//!
//! Both models map a [`FeatureVector`] to a completeness and a
//! contamination percentage. They are loaded once from JSON artifacts in
//! the data directory and shared read-only between worker threads.
//!
//! - [`gbt`]: gradient-boosted regression trees (the general model)
//! - [`neural`]: feed-forward network (the specific model)

pub mod gbt;
pub mod neural;

use std::fmt;
use std::path::Path;

use serde::de::DeserializeOwned;

pub use gbt::GradientBoostedModel;
pub use neural::NeuralModel;

use crate::features::{FeatureSchema, FeatureVector};
use crate::types::BinCheckError;

/// Which model produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelKind {
    General,
    Specific,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => write!(f, "general"),
            Self::Specific => write!(f, "specific"),
        }
    }
}

/// Unvalidated model output, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawEstimate {
    pub completeness: f64,
    pub contamination: f64,
}

/// A loaded model artifact.
pub trait QualityModel: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Feature schema version the model was trained against.
    fn schema_version(&self) -> &str;

    /// Declared input arity.
    fn n_features(&self) -> usize;

    /// Value substituted for undefined features.
    fn missing_value(&self) -> f64;

    /// Scores an already imputed vector of length [`Self::n_features`].
    fn evaluate(&self, values: &[f64]) -> RawEstimate;

    /// Scores one genome.
    ///
    /// # Errors
    ///
    /// Returns [`BinCheckError::SchemaMismatch`] when the vector length
    /// differs from the declared arity.
    fn predict(&self, features: &FeatureVector) -> Result<RawEstimate, BinCheckError> {
        if features.len() != self.n_features() {
            return Err(BinCheckError::SchemaMismatch(format!(
                "{} model expects {} features, got {}",
                self.kind(),
                self.n_features(),
                features.len()
            )));
        }
        Ok(self.evaluate(&features.impute(self.missing_value())))
    }

    /// Checks the model against the loaded feature schema.
    ///
    /// # Errors
    ///
    /// Returns [`BinCheckError::SchemaMismatch`] on a version or arity mismatch.
    fn check_schema(&self, schema: &FeatureSchema) -> Result<(), BinCheckError> {
        if self.schema_version() != schema.version() {
            return Err(BinCheckError::SchemaMismatch(format!(
                "{} model was trained on schema version {}, feature schema is version {}",
                self.kind(),
                self.schema_version(),
                schema.version()
            )));
        }
        if self.n_features() != schema.len() {
            return Err(BinCheckError::SchemaMismatch(format!(
                "{} model declares {} features, feature schema has {}",
                self.kind(),
                self.n_features(),
                schema.len()
            )));
        }
        Ok(())
    }
}

/// Reads a JSON model artifact; any failure is a fatal model error.
pub(crate) fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, BinCheckError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| BinCheckError::InvalidModel(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| BinCheckError::InvalidModel(format!("{}: {e}", path.display())))
}
