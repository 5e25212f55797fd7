//! Gene calling for one genome, including translation table detection.
//!
//! With [`TranslationTableChoice::Auto`] genes are predicted twice, with
//! table 11 and with table 4, and the coding densities are compared.
//! Genomes that recode TGA as tryptophan look artificially fragmented
//! under table 11, so table 4 wins when it covers noticeably more of the
//! genome and table 11 coverage is low.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::TranslationTableChoice;
use crate::constants::{MIN_SINGLE_PROCEDURE_LENGTH, TABLE4_DENSITY_GAIN, TABLE11_DENSITY_CEILING};
use crate::sequence::{ProteinSet, read_protein_set};
use crate::tools::{GeneCallRequest, GeneCaller, Procedure};
use crate::types::{BinCheckError, TranslationTable};

/// Sidecar stored next to a predicted protein file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneCallRecord {
    pub translation_table: u8,
}

impl GeneCallRecord {
    pub fn write(&self, path: &Path) -> Result<(), BinCheckError> {
        fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, BinCheckError> {
        let record: Self = serde_json::from_slice(&fs::read(path)?)?;
        TranslationTable::new(record.translation_table)
            .map_err(|e| BinCheckError::malformed(path, e))?;
        Ok(record)
    }
}

/// Procedure appropriate for a genome of `genome_size` bases.
#[must_use]
pub const fn procedure_for(genome_size: u64) -> Procedure {
    if genome_size < MIN_SINGLE_PROCEDURE_LENGTH {
        Procedure::Meta
    } else {
        Procedure::Single
    }
}

/// Picks table 4 over table 11 from the coding densities of both calls.
///
/// # Examples
///
/// ```rust
/// use bincheck_core::genes::choose_translation_table;
/// use bincheck_core::types::TranslationTable;
///
/// assert_eq!(choose_translation_table(0.88, 0.89), TranslationTable::BACTERIAL);
/// assert_eq!(choose_translation_table(0.55, 0.90), TranslationTable::MYCOPLASMA);
/// ```
#[must_use]
pub fn choose_translation_table(density_11: f64, density_4: f64) -> TranslationTable {
    if density_4 - density_11 > TABLE4_DENSITY_GAIN && density_11 < TABLE11_DENSITY_CEILING {
        TranslationTable::MYCOPLASMA
    } else {
        TranslationTable::BACTERIAL
    }
}

/// Predicts proteins for `genome` into `proteins_out` and returns the
/// translation table used.
///
/// `genome_size` is the total nucleotide length, used for the procedure
/// choice and coding densities.
///
/// # Errors
///
/// Genome-level errors only: an empty genome, a failing gene caller, or a
/// run that predicts no proteins.
pub fn call_genes(
    caller: &dyn GeneCaller,
    genome: &Path,
    genome_size: u64,
    choice: TranslationTableChoice,
    proteins_out: &Path,
) -> Result<TranslationTable, BinCheckError> {
    if genome_size == 0 {
        return Err(BinCheckError::EmptyInput(genome.display().to_string()));
    }
    let procedure = procedure_for(genome_size);

    match choice {
        TranslationTableChoice::Fixed(table) => {
            let proteins = run_caller(caller, genome, proteins_out, table, procedure)?;
            ensure_proteins(caller, genome, &proteins)?;
            Ok(table)
        }
        TranslationTableChoice::Auto => {
            let parent = proteins_out.parent().unwrap_or_else(|| Path::new("."));
            let scratch = tempfile::Builder::new()
                .prefix(".ttable-")
                .tempdir_in(parent)?;

            let path_11 = scratch.path().join("table11.faa");
            let proteins_11 =
                run_caller(caller, genome, &path_11, TranslationTable::BACTERIAL, procedure)?;
            ensure_proteins(caller, genome, &proteins_11)?;
            let density_11 = density(&proteins_11, genome_size);

            let path_4 = scratch.path().join("table4.faa");
            let table = match run_caller(caller, genome, &path_4, TranslationTable::MYCOPLASMA, procedure) {
                Ok(proteins_4) => {
                    let density_4 = density(&proteins_4, genome_size);
                    log::debug!(
                        "{}: coding density {:.4} (table 11) vs {:.4} (table 4)",
                        genome.display(),
                        density_11,
                        density_4
                    );
                    choose_translation_table(density_11, density_4)
                }
                Err(e) => {
                    log::debug!("{}: table 4 call failed ({e}); keeping table 11", genome.display());
                    TranslationTable::BACTERIAL
                }
            };

            let chosen: PathBuf = if table == TranslationTable::MYCOPLASMA {
                path_4
            } else {
                path_11
            };
            fs::rename(&chosen, proteins_out)?;
            Ok(table)
        }
    }
}

fn run_caller(
    caller: &dyn GeneCaller,
    genome: &Path,
    proteins: &Path,
    table: TranslationTable,
    procedure: Procedure,
) -> Result<ProteinSet, BinCheckError> {
    let request = GeneCallRequest {
        genome,
        proteins,
        table,
        procedure,
    };
    let output = caller.call(&request)?.into_result(caller.name())?;
    if !output.exists() {
        return Err(BinCheckError::tool(caller.name(), "no protein file written"));
    }
    read_protein_set(&output)
}

fn ensure_proteins(
    caller: &dyn GeneCaller,
    genome: &Path,
    proteins: &ProteinSet,
) -> Result<(), BinCheckError> {
    if proteins.is_empty() {
        return Err(BinCheckError::tool(
            caller.name(),
            format!("no genes predicted in {}", genome.display()),
        ));
    }
    Ok(())
}

fn density(proteins: &ProteinSet, genome_size: u64) -> f64 {
    proteins
        .coding_stats(Some(genome_size))
        .coding_density
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolOutcome;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Writes a fixed number of genes of a fixed span per table.
    struct ScriptedCaller {
        genes_11: usize,
        genes_4: usize,
        fail_table: Option<u8>,
        calls: Mutex<Vec<(u8, Procedure)>>,
    }

    impl ScriptedCaller {
        fn new(genes_11: usize, genes_4: usize) -> Self {
            Self {
                genes_11,
                genes_4,
                fail_table: None,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl GeneCaller for ScriptedCaller {
        fn name(&self) -> &str {
            "scripted"
        }

        fn call(&self, request: &GeneCallRequest<'_>) -> Result<ToolOutcome, BinCheckError> {
            self.calls
                .lock()
                .unwrap()
                .push((request.table.get(), request.procedure));
            if self.fail_table == Some(request.table.get()) {
                return Ok(ToolOutcome {
                    exit_code: Some(1),
                    output: request.proteins.to_path_buf(),
                    stderr: "boom".to_string(),
                });
            }
            let genes = if request.table.get() == 4 {
                self.genes_4
            } else {
                self.genes_11
            };
            let mut fasta = String::new();
            for i in 0..genes {
                let start = i * 100 + 1;
                fasta.push_str(&format!(
                    ">c_{} # {} # {} # 1\nMKV\n",
                    i + 1,
                    start,
                    start + 99
                ));
            }
            fs::write(request.proteins, fasta)?;
            Ok(ToolOutcome {
                exit_code: Some(0),
                output: request.proteins.to_path_buf(),
                stderr: String::new(),
            })
        }
    }

    #[test]
    fn test_choose_translation_table_rule() {
        assert_eq!(choose_translation_table(0.60, 0.66), TranslationTable::MYCOPLASMA);
        // gain not large enough
        assert_eq!(choose_translation_table(0.60, 0.64), TranslationTable::BACTERIAL);
        // table 11 density already high
        assert_eq!(choose_translation_table(0.72, 0.90), TranslationTable::BACTERIAL);
    }

    #[test]
    fn test_procedure_for_short_genomes() {
        assert_eq!(procedure_for(99_999), Procedure::Meta);
        assert_eq!(procedure_for(100_000), Procedure::Single);
    }

    #[test]
    fn test_auto_selects_table_4() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("bin.faa");
        // 10 kb genome: table 11 covers 50%, table 4 covers 90%
        let caller = ScriptedCaller::new(50, 90);

        let table = call_genes(&caller, Path::new("bin.fna"), 10_000, TranslationTableChoice::Auto, &out).unwrap();
        assert_eq!(table, TranslationTable::MYCOPLASMA);
        assert_eq!(read_protein_set(&out).unwrap().len(), 90);

        let calls = caller.calls.lock().unwrap();
        assert_eq!(*calls, vec![(11, Procedure::Meta), (4, Procedure::Meta)]);
    }

    #[test]
    fn test_auto_keeps_table_11() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("bin.faa");
        let caller = ScriptedCaller::new(88, 89);

        let table = call_genes(&caller, Path::new("bin.fna"), 10_000, TranslationTableChoice::Auto, &out).unwrap();
        assert_eq!(table, TranslationTable::BACTERIAL);
        assert_eq!(read_protein_set(&out).unwrap().len(), 88);
        // scratch directory is cleaned up
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_auto_survives_table_4_failure() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("bin.faa");
        let mut caller = ScriptedCaller::new(50, 90);
        caller.fail_table = Some(4);

        let table = call_genes(&caller, Path::new("bin.fna"), 10_000, TranslationTableChoice::Auto, &out).unwrap();
        assert_eq!(table, TranslationTable::BACTERIAL);
    }

    #[test]
    fn test_fixed_table_single_call() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("bin.faa");
        let caller = ScriptedCaller::new(5, 5);
        let fixed = TranslationTableChoice::Fixed(TranslationTable::new(25).unwrap());

        let table = call_genes(&caller, Path::new("bin.fna"), 200_000, fixed, &out).unwrap();
        assert_eq!(table.get(), 25);
        assert_eq!(*caller.calls.lock().unwrap(), vec![(25, Procedure::Single)]);
    }

    #[test]
    fn test_failures_are_genome_level() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("bin.faa");

        let mut failing = ScriptedCaller::new(5, 5);
        failing.fail_table = Some(11);
        let err = call_genes(&failing, Path::new("bin.fna"), 10_000, TranslationTableChoice::Auto, &out).unwrap_err();
        assert!(matches!(err, BinCheckError::ToolFailed { .. }));
        assert!(!err.is_fatal());

        let empty = ScriptedCaller::new(0, 0);
        let err = call_genes(&empty, Path::new("bin.fna"), 10_000, TranslationTableChoice::Auto, &out).unwrap_err();
        assert!(err.to_string().contains("no genes predicted"));

        let err = call_genes(&empty, Path::new("bin.fna"), 0, TranslationTableChoice::Auto, &out).unwrap_err();
        assert!(matches!(err, BinCheckError::EmptyInput(_)));
    }

    #[test]
    fn test_gene_call_record_roundtrip_and_validation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin.json");
        GeneCallRecord { translation_table: 4 }.write(&path).unwrap();
        assert_eq!(GeneCallRecord::read(&path).unwrap().translation_table, 4);

        fs::write(&path, br#"{"translation_table": 7}"#).unwrap();
        assert!(matches!(
            GeneCallRecord::read(&path),
            Err(BinCheckError::MalformedArtifact { .. })
        ));

        fs::write(&path, b"garbage").unwrap();
        assert!(GeneCallRecord::read(&path).is_err());
    }
}
