//! Capability interfaces for the external programs the workflow drives.
//!
//! Gene calling and homology search are black boxes with a file-in,
//! file-out contract. The pipeline only talks to them through
//! [`GeneCaller`] and [`HomologySearcher`], so tests and alternative
//! back-ends can substitute in-process implementations.
//!
//! - [`prodigal`]: Prodigal-compatible gene caller
//! - [`diamond`]: DIAMOND-compatible protein aligner

pub mod diamond;
pub mod prodigal;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub use diamond::DiamondSearcher;
pub use prodigal::ProdigalGeneCaller;

use crate::config::SearchParams;
use crate::types::{BinCheckError, TranslationTable};

/// Gene-calling procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Procedure {
    /// Train on the genome itself.
    Single,
    /// Use pre-computed models; for short genomes.
    Meta,
}

/// One gene-calling invocation.
#[derive(Debug, Clone)]
pub struct GeneCallRequest<'a> {
    /// Nucleotide FASTA.
    pub genome: &'a Path,
    /// Where predicted proteins must be written.
    pub proteins: &'a Path,
    pub table: TranslationTable,
    pub procedure: Procedure,
}

/// One homology-search invocation.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    /// Protein FASTA, possibly concatenated over several genomes.
    pub query: &'a Path,
    pub database: &'a Path,
    /// Where the BLAST-tabular hit table must be written.
    pub output: &'a Path,
    pub threads: usize,
    pub params: SearchParams,
}

/// Exit status and output location of one external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Process exit code; `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    pub output: PathBuf,
    /// Captured standard error, kept for diagnostics.
    pub stderr: String,
}

impl ToolOutcome {
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    /// Turns a non-zero exit into [`BinCheckError::ToolFailed`].
    pub fn into_result(self, tool: &str) -> Result<PathBuf, BinCheckError> {
        if self.success() {
            return Ok(self.output);
        }
        let status = self
            .exit_code
            .map_or_else(|| "terminated by signal".to_string(), |code| format!("exit code {code}"));
        let detail = self.stderr.lines().last().unwrap_or("").trim();
        let message = if detail.is_empty() {
            status
        } else {
            format!("{status}: {detail}")
        };
        Err(BinCheckError::tool(tool, message))
    }
}

/// Predicts protein-coding genes in a nucleotide genome.
pub trait GeneCaller: Send + Sync {
    /// Tool name used in diagnostics.
    fn name(&self) -> &str;

    /// Runs gene prediction for one genome.
    ///
    /// A non-zero exit is reported through [`ToolOutcome`], not as `Err`;
    /// `Err` means the program could not be started at all.
    fn call(&self, request: &GeneCallRequest<'_>) -> Result<ToolOutcome, BinCheckError>;

    /// Checks that the tool can be started.
    fn check_available(&self) -> Result<(), BinCheckError> {
        Ok(())
    }
}

/// Aligns proteins against the reference database.
pub trait HomologySearcher: Send + Sync {
    /// Tool name used in diagnostics.
    fn name(&self) -> &str;

    /// Runs one search. Same exit-status contract as [`GeneCaller::call`].
    fn search(&self, request: &SearchRequest<'_>) -> Result<ToolOutcome, BinCheckError>;

    /// Checks that the tool can be started.
    fn check_available(&self) -> Result<(), BinCheckError> {
        Ok(())
    }
}

/// Runs an external command, discarding stdout and capturing stderr.
pub(crate) fn run_command(
    tool: &str,
    mut command: Command,
    output: &Path,
) -> Result<ToolOutcome, BinCheckError> {
    log::debug!("Running {command:?}");
    let result = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| spawn_error(tool, &e))?;

    Ok(ToolOutcome {
        exit_code: result.status.code(),
        output: output.to_path_buf(),
        stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
    })
}

/// Detects whether `program` is on `PATH` by spawning it with `args`.
///
/// Any successful spawn counts, whatever the exit code.
pub(crate) fn probe_executable(tool: &str, program: &Path, args: &[&str]) -> Result<(), BinCheckError> {
    match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(_) => Ok(()),
        Err(e) => Err(BinCheckError::InvalidConfig(
            spawn_error(tool, &e).to_string(),
        )),
    }
}

fn spawn_error(tool: &str, error: &std::io::Error) -> BinCheckError {
    if error.kind() == ErrorKind::NotFound {
        BinCheckError::tool(tool, "executable not found in PATH")
    } else {
        BinCheckError::tool(tool, format!("could not be started: {error}"))
    }
}
