//! Tab-separated quality report.
//!
//! One row per processed genome, sorted by name. Failed genomes keep their
//! row with `NA` estimates and the failure in `Additional_Notes`.

use std::io::Write;
use std::path::Path;

use crate::config::ModelMode;
use crate::ensemble::{Prediction, QualityFlag};
use crate::models::ModelKind;
use crate::sequence::{CodingStats, GenomeStats};
use crate::types::{BinCheckError, TranslationTable};

const NA: &str = "NA";

/// Result part of a report row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Scored(Prediction),
    /// Stage label and diagnostic.
    Failed { stage: String, message: String },
}

/// One genome of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub name: String,
    pub outcome: RowOutcome,
    pub translation_table: Option<TranslationTable>,
    /// Unknown for protein inputs and for genomes that failed early.
    pub genome: Option<GenomeStats>,
    pub coding: Option<CodingStats>,
}

impl ReportRow {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, RowOutcome::Failed { .. })
    }

    fn notes(&self) -> String {
        let notes: Vec<String> = match &self.outcome {
            RowOutcome::Scored(prediction) => {
                prediction.flags.iter().map(QualityFlag::to_string).collect()
            }
            RowOutcome::Failed { stage, message } => vec![format!("failed at {stage}: {message}")],
        };
        if notes.is_empty() {
            "None".to_string()
        } else {
            notes.join("; ")
        }
    }

    fn estimate_fields(&self, kind: ModelKind) -> [String; 2] {
        match &self.outcome {
            RowOutcome::Scored(prediction) => prediction.estimate(kind).map_or_else(
                || [NA.to_string(), NA.to_string()],
                |e| [format!("{:.2}", e.completeness), format!("{:.2}", e.contamination)],
            ),
            RowOutcome::Failed { .. } => [NA.to_string(), NA.to_string()],
        }
    }

    fn record(&self, mode: ModelMode) -> Vec<String> {
        let mut record = vec![self.name.clone()];
        match mode {
            ModelMode::Both => {
                record.extend(self.estimate_fields(ModelKind::General));
                record.extend(self.estimate_fields(ModelKind::Specific));
            }
            _ => {
                let used = match &self.outcome {
                    RowOutcome::Scored(prediction) => prediction.estimates.first().map(|e| e.model),
                    RowOutcome::Failed { .. } => None,
                };
                match used {
                    Some(kind) => {
                        record.extend(self.estimate_fields(kind));
                        record.push(kind.to_string());
                    }
                    None => record.extend([NA, NA, NA].map(String::from)),
                }
            }
        }

        record.push(optional(self.translation_table));
        let coding = self.coding.as_ref();
        record.push(optional(coding.and_then(|c| c.coding_density).map(|d| format!("{d:.3}"))));
        let genome = self.genome.as_ref();
        record.push(optional(genome.map(|g| g.contig_n50)));
        record.push(optional(coding.map(|c| format!("{:.2}", c.mean_gene_length))));
        record.push(optional(genome.map(|g| g.genome_size)));
        record.push(optional(genome.map(|g| format!("{:.2}", g.gc_content))));
        record.push(optional(coding.map(|c| c.coding_sequences)));
        record.push(optional(genome.map(|g| g.contig_count)));
        record.push(optional(genome.map(|g| g.max_contig_length)));
        record.push(self.notes());
        record
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| NA.to_string(), |v| v.to_string())
}

/// Completed report for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    mode: ModelMode,
    rows: Vec<ReportRow>,
}

impl QualityReport {
    /// Sorts rows by genome name so output is independent of completion order.
    #[must_use]
    pub fn new(mode: ModelMode, mut rows: Vec<ReportRow>) -> Self {
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Self { mode, rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, name: &str) -> Option<&ReportRow> {
        self.rows.iter().find(|row| row.name == name)
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.rows.iter().filter(|row| row.is_failed()).count()
    }

    #[must_use]
    pub fn header(&self) -> Vec<&'static str> {
        let mut header = vec!["Name"];
        if self.mode == ModelMode::Both {
            header.extend([
                "Completeness_General",
                "Contamination_General",
                "Completeness_Specific",
                "Contamination_Specific",
            ]);
        } else {
            header.extend(["Completeness", "Contamination", "Completeness_Model_Used"]);
        }
        header.extend([
            "Translation_Table_Used",
            "Coding_Density",
            "Contig_N50",
            "Average_Gene_Length",
            "Genome_Size",
            "GC_Content",
            "Total_Coding_Sequences",
            "Total_Contigs",
            "Max_Contig_Length",
            "Additional_Notes",
        ]);
        header
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), BinCheckError> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(writer);
        wtr.write_record(self.header())?;
        for row in &self.rows {
            wtr.write_record(row.record(self.mode))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Writes the report to `path`, replacing any previous file.
    pub fn write(&self, path: &Path) -> Result<(), BinCheckError> {
        self.write_to(std::fs::File::create(path)?)
    }
}
