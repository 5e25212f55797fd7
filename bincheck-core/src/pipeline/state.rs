use std::fmt;
use std::path::PathBuf;

use crate::ensemble::Prediction;
use crate::report::{ReportRow, RowOutcome};
use crate::sequence::{CodingStats, GenomeStats};
use crate::types::{BinCheckError, TranslationTable};

/// Progress of one genome through the workflow.
///
/// ```text
/// Pending -> GenesCalled -> Searched -> Featurized -> Scored
///    \___________\______________\___________\______-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Pending,
    GenesCalled,
    Searched,
    Featurized,
    Scored,
    Failed,
}

impl Stage {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Scored | Self::Failed)
    }
}

/// Work step during which a genome failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    GeneCalling,
    HomologySearch,
    Featurization,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GeneCalling => write!(f, "gene calling"),
            Self::HomologySearch => write!(f, "homology search"),
            Self::Featurization => write!(f, "featurization"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub step: Step,
    pub message: String,
}

/// One input genome and everything learned about it so far.
#[derive(Debug, Clone)]
pub struct GenomeUnit {
    /// File stem of the input; unique within a run.
    pub id: String,
    pub input: PathBuf,
    pub stage: Stage,
    pub translation_table: Option<TranslationTable>,
    /// Predicted (or supplied) proteins.
    pub proteins: Option<PathBuf>,
    pub genome_stats: Option<GenomeStats>,
    pub coding_stats: Option<CodingStats>,
    pub prediction: Option<Prediction>,
    pub failure: Option<Failure>,
}

impl GenomeUnit {
    pub fn new(id: impl Into<String>, input: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            input: input.into(),
            stage: Stage::Pending,
            translation_table: None,
            proteins: None,
            genome_stats: None,
            coding_stats: None,
            prediction: None,
            failure: None,
        }
    }

    /// Moves forward to `stage`; failed genomes stay failed.
    pub fn advance(&mut self, stage: Stage) {
        if self.stage != Stage::Failed {
            debug_assert!(stage > self.stage, "{} cannot go from {:?} to {stage:?}", self.id, self.stage);
            self.stage = stage;
        }
    }

    pub fn fail(&mut self, step: Step, error: &BinCheckError) {
        log::warn!("{}: {step} failed: {error}", self.id);
        self.stage = Stage::Failed;
        self.failure = Some(Failure {
            step,
            message: error.to_string(),
        });
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.stage == Stage::Failed
    }

    /// Report row for a genome in a terminal stage.
    #[must_use]
    pub fn to_report_row(&self) -> ReportRow {
        let outcome = match (&self.failure, &self.prediction) {
            (Some(failure), _) => RowOutcome::Failed {
                stage: failure.step.to_string(),
                message: failure.message.clone(),
            },
            (None, Some(prediction)) => RowOutcome::Scored(prediction.clone()),
            (None, None) => RowOutcome::Failed {
                stage: format!("{:?}", self.stage).to_lowercase(),
                message: "genome did not finish".to_string(),
            },
        };
        ReportRow {
            name: self.id.clone(),
            outcome,
            translation_table: self.translation_table,
            genome: self.genome_stats,
            coding: self.coding_stats,
        }
    }
}
