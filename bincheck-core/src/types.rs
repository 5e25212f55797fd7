use std::fmt;

use thiserror::Error;

/// Numeric genetic code identifier as understood by the gene caller.
///
/// Only the tables in [`crate::constants::ALLOWED_TRANSLATION_TABLES`] are
/// accepted; construct through [`TranslationTable::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TranslationTable(u8);

impl TranslationTable {
    /// Standard bacterial, archaeal and plant plastid code.
    pub const BACTERIAL: Self = Self(11);

    /// Mycoplasma/Spiroplasma code (TGA encodes tryptophan).
    pub const MYCOPLASMA: Self = Self(4);

    /// Validates `table` against the allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`BinCheckError::InvalidConfig`] for tables the gene caller
    /// does not support.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bincheck_core::types::TranslationTable;
    ///
    /// assert_eq!(TranslationTable::new(11)?.get(), 11);
    /// assert!(TranslationTable::new(7).is_err());
    /// # Ok::<(), bincheck_core::types::BinCheckError>(())
    /// ```
    pub fn new(table: u8) -> Result<Self, BinCheckError> {
        if crate::constants::ALLOWED_TRANSLATION_TABLES.contains(&table) {
            Ok(Self(table))
        } else {
            Err(BinCheckError::InvalidConfig(format!(
                "Translation table {table} is not valid"
            )))
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for TranslationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised anywhere in the prediction workflow.
///
/// Variants fall in two classes, see [`BinCheckError::is_fatal`]:
///
/// - **Fatal**: configuration problems detected before any genome is
///   processed (database, schemas, models, arguments). The run aborts.
/// - **Genome-level**: problems confined to one genome (empty input, a
///   failing external tool, an unreadable intermediate). The genome is
///   reported as failed and its siblings continue.
#[derive(Error, Debug)]
pub enum BinCheckError {
    /// Invalid arguments or data-directory contents
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// Reference protein database missing or failed validation
    #[error("Reference database unavailable: {0}")]
    Database(String),
    /// Feature vector does not match what a model expects
    #[error("Feature schema mismatch: {0}")]
    SchemaMismatch(String),
    /// Model artifact could not be loaded or produced unusable output
    #[error("Invalid model artifact: {0}")]
    InvalidModel(String),
    /// External program exited unsuccessfully or produced nothing
    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },
    /// Input genome holds no usable sequence
    #[error("Empty input: {0}")]
    EmptyInput(String),
    /// Per-genome intermediate file is present but unreadable
    #[error("Malformed intermediate {path}: {message}")]
    MalformedArtifact { path: String, message: String },
    /// File I/O operation failed
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    /// Error parsing input data
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Tabular file could not be read or written
    #[error("Table error: {0}")]
    Table(#[from] csv::Error),
    /// JSON document could not be read or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Self-test genomes are corrupt or were predicted outside their ranges
    #[error("Test run failed: {0}")]
    TestRun(String),
}

impl BinCheckError {
    /// Whether the error must abort the whole run rather than a single genome.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_)
                | Self::Database(_)
                | Self::SchemaMismatch(_)
                | Self::InvalidModel(_)
                | Self::TestRun(_)
        )
    }

    pub(crate) fn tool(tool: &str, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn malformed(path: &std::path::Path, message: impl fmt::Display) -> Self {
        Self::MalformedArtifact {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}
