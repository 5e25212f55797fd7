//! Model selection and output validation.
//!
//! In [`ModelMode::Auto`] each genome is routed by the maximum cosine
//! similarity of its amino-acid composition to the reference centroids:
//! at or above the specific model's threshold the specific model scores
//! it, otherwise the general model does. The threshold is the lower edge
//! of the specific model's training range.

use std::fmt;

use crate::config::ModelMode;
use crate::constants::MAX_COMPLETENESS;
use crate::features::FeatureVector;
use crate::models::{ModelKind, QualityModel, RawEstimate};
use crate::types::BinCheckError;

/// Condition surfaced in the report notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QualityFlag {
    /// Composition similarity below the specific model's training range.
    PoorTrainingAnalog,
    /// The given model estimated completeness above 100 %.
    CompletenessAbove100(ModelKind),
}

impl fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoorTrainingAnalog => write!(f, "poor training analog"),
            Self::CompletenessAbove100(model) => write!(f, "completeness above 100 ({model})"),
        }
    }
}

/// Validated estimate of one model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub model: ModelKind,
    pub completeness: f64,
    pub contamination: f64,
}

/// All estimates for one genome plus its flags.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Prediction {
    /// One estimate per model used, general first.
    pub estimates: Vec<Estimate>,
    pub flags: Vec<QualityFlag>,
}

impl Prediction {
    #[must_use]
    pub fn estimate(&self, model: ModelKind) -> Option<&Estimate> {
        self.estimates.iter().find(|e| e.model == model)
    }
}

/// Applies the configured mode to the loaded models.
pub struct ModelSelector {
    mode: ModelMode,
    general: Option<Box<dyn QualityModel>>,
    specific: Option<Box<dyn QualityModel>>,
    threshold: Option<f64>,
}

impl fmt::Debug for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSelector")
            .field("mode", &self.mode)
            .field("general", &self.general.is_some())
            .field("specific", &self.specific.is_some())
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl ModelSelector {
    /// # Errors
    ///
    /// Returns [`BinCheckError::InvalidConfig`] when a model the mode needs
    /// is missing, or when auto mode has no similarity threshold.
    pub fn new(
        mode: ModelMode,
        general: Option<Box<dyn QualityModel>>,
        specific: Option<Box<dyn QualityModel>>,
        threshold: Option<f64>,
    ) -> Result<Self, BinCheckError> {
        if mode.needs_general() && general.is_none() {
            return Err(BinCheckError::InvalidConfig(format!(
                "{mode} mode needs the general model"
            )));
        }
        if mode.needs_specific() && specific.is_none() {
            return Err(BinCheckError::InvalidConfig(format!(
                "{mode} mode needs the specific model"
            )));
        }
        if mode == ModelMode::Auto && threshold.is_none() {
            return Err(BinCheckError::InvalidConfig(
                "auto mode needs a cosine similarity threshold; none is declared by the specific model"
                    .to_string(),
            ));
        }
        Ok(Self {
            mode,
            general,
            specific,
            threshold,
        })
    }

    /// Whether the composition signal lies inside the specific model's range.
    /// `None` when no threshold is known.
    #[must_use]
    pub fn in_training_range(&self, cosine_max: Option<f64>) -> Option<bool> {
        self.threshold
            .map(|threshold| cosine_max.is_some_and(|signal| signal >= threshold))
    }

    /// Models that score a genome with the given signal.
    #[must_use]
    pub fn models_for(&self, cosine_max: Option<f64>) -> Vec<ModelKind> {
        match self.mode {
            ModelMode::General => vec![ModelKind::General],
            ModelMode::Specific => vec![ModelKind::Specific],
            ModelMode::Both => vec![ModelKind::General, ModelKind::Specific],
            ModelMode::Auto => match self.in_training_range(cosine_max) {
                Some(true) => vec![ModelKind::Specific],
                _ => vec![ModelKind::General],
            },
        }
    }

    /// Scores one genome.
    ///
    /// # Errors
    ///
    /// Any error is fatal: a wrong-shape vector or a non-finite output
    /// means the models and schema disagree.
    pub fn predict(
        &self,
        features: &FeatureVector,
        cosine_max: Option<f64>,
    ) -> Result<Prediction, BinCheckError> {
        let mut prediction = Prediction::default();
        if self.in_training_range(cosine_max) == Some(false) {
            prediction.flags.push(QualityFlag::PoorTrainingAnalog);
        }

        for kind in self.models_for(cosine_max) {
            let model = match kind {
                ModelKind::General => self.general.as_deref(),
                ModelKind::Specific => self.specific.as_deref(),
            }
            .ok_or_else(|| BinCheckError::InvalidConfig(format!("{kind} model is not loaded")))?;

            let estimate = validate_output(kind, model.predict(features)?)?;
            if estimate.completeness > MAX_COMPLETENESS {
                prediction.flags.push(QualityFlag::CompletenessAbove100(kind));
            }
            prediction.estimates.push(estimate);
        }
        Ok(prediction)
    }
}

/// Clamps negatives to zero; completeness above 100 is kept for flagging.
fn validate_output(model: ModelKind, raw: RawEstimate) -> Result<Estimate, BinCheckError> {
    if !raw.completeness.is_finite() || !raw.contamination.is_finite() {
        return Err(BinCheckError::InvalidModel(format!(
            "{model} model produced a non-finite estimate ({}, {})",
            raw.completeness, raw.contamination
        )));
    }
    Ok(Estimate {
        model,
        completeness: raw.completeness.max(0.0),
        contamination: raw.contamination.max(0.0),
    })
}
