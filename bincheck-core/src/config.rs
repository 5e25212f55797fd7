use std::fmt;
use std::path::PathBuf;

use crate::constants::{
    BLOCK_SIZE, DEFAULT_SEARCH_BATCH_SIZE, INDEX_CHUNKS, LOW_MEMORY_BLOCK_SIZE,
    LOW_MEMORY_INDEX_CHUNKS,
};
use crate::types::{BinCheckError, TranslationTable};

/// Which quality model(s) score each genome.
///
/// # Modes
///
/// - **Auto**: choose per genome from its composition signal
/// - **General**: always the gradient-boosted model
/// - **Specific**: always the neural network model
/// - **Both**: score with both models and report both
///
/// # Examples
///
/// ```rust
/// use bincheck_core::config::ModelMode;
///
/// assert_eq!(ModelMode::from_flags(false, false, false)?, ModelMode::Auto);
/// assert_eq!(ModelMode::from_flags(true, false, false)?, ModelMode::General);
/// assert!(ModelMode::from_flags(true, true, false).is_err());
/// # Ok::<(), bincheck_core::types::BinCheckError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelMode {
    /// Select the model per genome.
    #[default]
    Auto,
    /// Force the gradient-boosted general model.
    General,
    /// Force the neural network specific model.
    Specific,
    /// Report both models side by side.
    Both,
}

impl ModelMode {
    /// Resolves the mutually exclusive `--general`, `--specific` and
    /// `--allmodels` switches.
    ///
    /// # Errors
    ///
    /// Returns [`BinCheckError::InvalidConfig`] when more than one switch is set.
    pub fn from_flags(general: bool, specific: bool, all_models: bool) -> Result<Self, BinCheckError> {
        match (general, specific, all_models) {
            (false, false, false) => Ok(Self::Auto),
            (true, false, false) => Ok(Self::General),
            (false, true, false) => Ok(Self::Specific),
            (false, false, true) => Ok(Self::Both),
            _ => Err(BinCheckError::InvalidConfig(
                "Only one of --general --specific --allmodels can be specified".to_string(),
            )),
        }
    }

    /// Whether the general model must be loaded for this mode.
    #[must_use]
    pub const fn needs_general(self) -> bool {
        !matches!(self, Self::Specific)
    }

    /// Whether the specific model must be loaded for this mode.
    #[must_use]
    pub const fn needs_specific(self) -> bool {
        !matches!(self, Self::General)
    }
}

impl fmt::Display for ModelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::General => write!(f, "general"),
            Self::Specific => write!(f, "specific"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// Translation table selection for gene calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationTableChoice {
    /// Pick between tables 11 and 4 from coding density.
    #[default]
    Auto,
    /// Use the given table for every genome.
    Fixed(TranslationTable),
}

/// Optional diagnostic artifacts written next to the report.
///
/// Enabling these never changes predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebugFlags {
    /// Write the raw cosine similarity of each genome to every reference centroid.
    pub cosine: bool,
    /// Write each genome's feature vector as JSON.
    pub vectors: bool,
}

impl DebugFlags {
    #[must_use]
    pub const fn any(self) -> bool {
        self.cosine || self.vectors
    }
}

/// Memory/speed trade-off parameters handed to the homology searcher.
///
/// Low-memory mode only changes these numbers; nothing else in the
/// workflow depends on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    /// Sequence block size in billions of letters.
    pub block_size: f64,
    /// Number of chunks the seed index is split into.
    pub index_chunks: u32,
}

impl SearchParams {
    #[must_use]
    pub const fn for_memory_mode(low_memory: bool) -> Self {
        if low_memory {
            Self {
                block_size: LOW_MEMORY_BLOCK_SIZE,
                index_chunks: LOW_MEMORY_INDEX_CHUNKS,
            }
        } else {
            Self {
                block_size: BLOCK_SIZE,
                index_chunks: INDEX_CHUNKS,
            }
        }
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::for_memory_mode(false)
    }
}

/// Configuration settings for a prediction run.
///
/// # Examples
///
/// ```rust
/// use bincheck_core::config::{ModelMode, PipelineConfig};
///
/// let config = PipelineConfig {
///     mode: ModelMode::Both,
///     threads: 8,
///     low_memory: true,
///     ..Default::default()
/// };
/// assert!(config.resume == false);
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model selection mode.
    ///
    /// **Default**: [`ModelMode::Auto`]
    pub mode: ModelMode,

    /// Worker threads for per-genome stages; also passed to the searcher.
    ///
    /// **Default**: `1`
    pub threads: usize,

    /// Trade search throughput for lower peak memory.
    ///
    /// **Default**: `false`
    pub low_memory: bool,

    /// Reference protein database used by the homology searcher.
    ///
    /// **Default**: empty; must be resolved before the run starts.
    pub database: PathBuf,

    /// Directory holding the feature schema, module definitions, amino-acid
    /// reference table and model artifacts.
    pub data_dir: PathBuf,

    /// Genetic code selection.
    ///
    /// **Default**: [`TranslationTableChoice::Auto`]
    pub translation_table: TranslationTableChoice,

    /// Inputs are already predicted proteins; skip gene calling.
    ///
    /// **Default**: `false`
    pub genes_input: bool,

    /// Reuse intermediate artifacts found in the output directory.
    ///
    /// **Default**: `false`
    pub resume: bool,

    /// Delete protein and hit-table intermediates once the report is written.
    ///
    /// **Default**: `false`
    pub remove_intermediates: bool,

    /// Diagnostic side outputs.
    pub debug: DebugFlags,

    /// Genomes per homology-search invocation.
    ///
    /// **Default**: [`DEFAULT_SEARCH_BATCH_SIZE`]
    pub search_batch_size: usize,

    /// Overrides the specific model's declared minimum cosine similarity
    /// used by [`ModelMode::Auto`].
    ///
    /// **Default**: `None` (use the artifact's value)
    pub specific_min_cosine: Option<f64>,
}

impl PipelineConfig {
    #[must_use]
    pub const fn search_params(&self) -> SearchParams {
        SearchParams::for_memory_mode(self.low_memory)
    }

    /// Checks settings that do not need the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`BinCheckError::InvalidConfig`] for a zero thread count or
    /// batch size, or a cosine threshold outside `[-1, 1]`.
    pub fn validate(&self) -> Result<(), BinCheckError> {
        if self.threads == 0 {
            return Err(BinCheckError::InvalidConfig(
                "Thread count must be at least 1".to_string(),
            ));
        }
        if self.search_batch_size == 0 {
            return Err(BinCheckError::InvalidConfig(
                "Search batch size must be at least 1".to_string(),
            ));
        }
        if let Some(threshold) = self.specific_min_cosine
            && !(-1.0..=1.0).contains(&threshold)
        {
            return Err(BinCheckError::InvalidConfig(format!(
                "Cosine similarity threshold {threshold} is outside [-1, 1]"
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: ModelMode::Auto,
            threads: 1,
            low_memory: false,
            database: PathBuf::new(),
            data_dir: PathBuf::new(),
            translation_table: TranslationTableChoice::Auto,
            genes_input: false,
            resume: false,
            remove_intermediates: false,
            debug: DebugFlags::default(),
            search_batch_size: DEFAULT_SEARCH_BATCH_SIZE,
            specific_min_cosine: None,
        }
    }
}
