//! Self-test genomes shipped with the data directory.
//!
//! `<data_dir>/testrun/` holds a few small genomes (`<name>.tst`) and an
//! `expected.tsv` manifest with, per genome, its SHA-256 and the
//! completeness and contamination ranges a working installation predicts
//! for it in automatic model mode.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::constants::{TESTRUN_DIR, TESTRUN_EXTENSION, TESTRUN_MANIFEST};
use crate::database::ChecksumValidator;
use crate::report::{QualityReport, RowOutcome};
use crate::types::BinCheckError;

/// Manifest row for one test genome.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExpectedQuality {
    pub name: String,
    pub sha256: String,
    pub completeness_min: f64,
    pub completeness_max: f64,
    pub contamination_min: f64,
    pub contamination_max: f64,
}

impl ExpectedQuality {
    fn problem(&self, report: &QualityReport) -> Option<String> {
        let Some(row) = report.row(&self.name) else {
            return Some(format!("{}: missing from the report", self.name));
        };
        let estimate = match &row.outcome {
            RowOutcome::Failed { stage, message } => {
                return Some(format!("{}: failed at {stage}: {message}", self.name));
            }
            RowOutcome::Scored(prediction) => match prediction.estimates.first() {
                Some(estimate) => estimate,
                None => return Some(format!("{}: no estimate", self.name)),
            },
        };
        let completeness = self.completeness_min..=self.completeness_max;
        let contamination = self.contamination_min..=self.contamination_max;
        if !completeness.contains(&estimate.completeness) {
            return Some(format!(
                "{}: completeness {:.2} outside {:.2}-{:.2}",
                self.name, estimate.completeness, self.completeness_min, self.completeness_max
            ));
        }
        if !contamination.contains(&estimate.contamination) {
            return Some(format!(
                "{}: contamination {:.2} outside {:.2}-{:.2}",
                self.name, estimate.contamination, self.contamination_min, self.contamination_max
            ));
        }
        None
    }
}

/// The bundled test genomes and what they should score.
#[derive(Debug, Clone)]
pub struct TestSet {
    dir: PathBuf,
    expected: Vec<ExpectedQuality>,
}

impl TestSet {
    /// Reads the manifest under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`BinCheckError::InvalidConfig`] when the manifest is missing,
    /// unreadable or lists no genome.
    pub fn load(data_dir: &Path) -> Result<Self, BinCheckError> {
        let dir = data_dir.join(TESTRUN_DIR);
        let manifest = dir.join(TESTRUN_MANIFEST);
        let invalid = |e: &dyn std::fmt::Display| {
            BinCheckError::InvalidConfig(format!("test genome manifest {}: {e}", manifest.display()))
        };

        let file = std::fs::File::open(&manifest).map_err(|e| invalid(&e))?;
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(file);
        let expected = rdr
            .deserialize()
            .collect::<Result<Vec<ExpectedQuality>, _>>()
            .map_err(|e| invalid(&e))?;
        if expected.is_empty() {
            return Err(invalid(&"no test genomes listed"));
        }
        Ok(Self { dir, expected })
    }

    #[must_use]
    pub fn expected(&self) -> &[ExpectedQuality] {
        &self.expected
    }

    #[must_use]
    pub fn genome(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{TESTRUN_EXTENSION}"))
    }

    /// Paths of all test genomes in manifest order.
    #[must_use]
    pub fn genomes(&self) -> Vec<PathBuf> {
        self.expected.iter().map(|e| self.genome(&e.name)).collect()
    }

    /// Compares every genome with its manifest checksum.
    ///
    /// # Errors
    ///
    /// Returns [`BinCheckError::TestRun`] naming each missing or altered genome.
    pub fn verify_checksums(&self) -> Result<(), BinCheckError> {
        let mut problems = Vec::new();
        for expected in &self.expected {
            let path = self.genome(&expected.name);
            match ChecksumValidator::digest(&path) {
                Ok(digest) if digest.eq_ignore_ascii_case(&expected.sha256) => {}
                Ok(_) => problems.push(format!("{}: checksum mismatch", path.display())),
                Err(e) => problems.push(format!("{}: {e}", path.display())),
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(BinCheckError::TestRun(problems.join("; ")))
        }
    }

    /// Checks that each test genome was scored inside its expected ranges.
    ///
    /// # Errors
    ///
    /// Returns [`BinCheckError::TestRun`] listing every genome that is
    /// missing, failed or scored out of range.
    pub fn check(&self, report: &QualityReport) -> Result<(), BinCheckError> {
        let problems: Vec<String> = self
            .expected
            .iter()
            .filter_map(|expected| expected.problem(report))
            .collect();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(BinCheckError::TestRun(problems.join("; ")))
        }
    }
}
