use crate::annotation::ModuleSchema;
use crate::composition::ReferenceComposition;
use crate::config::{ModelMode, PipelineConfig};
use crate::constants::{
    AA_REFERENCE_FILE, FEATURE_SCHEMA_FILE, GENERAL_MODEL_FILE, MODULE_DEFINITIONS_FILE,
    SPECIFIC_MODEL_FILE,
};
use crate::ensemble::ModelSelector;
use crate::features::FeatureSchema;
use crate::models::{GradientBoostedModel, NeuralModel, QualityModel};
use crate::types::BinCheckError;

/// Read-only data shared by every genome of a run.
///
/// Built once before any genome is processed; every problem found here is
/// fatal.
#[derive(Debug)]
pub struct PipelineContext {
    pub schema: FeatureSchema,
    pub modules: ModuleSchema,
    pub reference: ReferenceComposition,
    pub selector: ModelSelector,
}

impl PipelineContext {
    /// Loads schemas, reference tables and the models `config.mode` needs
    /// from `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`BinCheckError`] for a missing or invalid file, or
    /// when a model disagrees with the feature schema.
    pub fn load(config: &PipelineConfig) -> Result<Self, BinCheckError> {
        let dir = config.data_dir.as_path();
        if !dir.is_dir() {
            return Err(BinCheckError::InvalidConfig(format!(
                "data directory {} does not exist",
                dir.display()
            )));
        }

        let schema = FeatureSchema::from_path(&dir.join(FEATURE_SCHEMA_FILE))?;
        let modules = ModuleSchema::from_path(&dir.join(MODULE_DEFINITIONS_FILE))?;
        let reference = ReferenceComposition::from_path(&dir.join(AA_REFERENCE_FILE))?;
        schema.check_sources(&modules, &reference)?;

        let general = if config.mode.needs_general() {
            let model = GradientBoostedModel::from_path(&dir.join(GENERAL_MODEL_FILE))?;
            Some(Box::new(model) as Box<dyn QualityModel>)
        } else {
            None
        };
        let specific = if config.mode.needs_specific() {
            Some(NeuralModel::from_path(&dir.join(SPECIFIC_MODEL_FILE))?)
        } else {
            None
        };

        let declared = specific.as_ref().and_then(|m| m.min_cosine_similarity);
        let threshold = config.specific_min_cosine.or(declared);
        let specific = specific.map(|m| Box::new(m) as Box<dyn QualityModel>);

        for model in general.iter().chain(specific.iter()) {
            model.check_schema(&schema)?;
        }

        log::debug!(
            "Loaded feature schema v{} with {} features, {} modules, {} reference centroids",
            schema.version(),
            schema.len(),
            modules.len(),
            reference.len()
        );
        if config.mode == ModelMode::Auto
            && let Some(threshold) = threshold
        {
            log::debug!("Specific model used at cosine similarity >= {threshold}");
        }

        let selector = ModelSelector::new(config.mode, general, specific, threshold)?;
        Ok(Self {
            schema,
            modules,
            reference,
            selector,
        })
    }
}
