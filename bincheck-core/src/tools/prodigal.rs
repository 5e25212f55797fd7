use std::path::PathBuf;
use std::process::Command;

use super::{GeneCallRequest, GeneCaller, Procedure, ToolOutcome, probe_executable, run_command};
use crate::types::BinCheckError;

const TOOL: &str = "prodigal";

/// Gene caller backed by a Prodigal-compatible executable.
///
/// # Examples
///
/// ```rust
/// use bincheck_core::tools::{GeneCaller, ProdigalGeneCaller};
///
/// let caller = ProdigalGeneCaller::default();
/// assert_eq!(caller.name(), "prodigal");
/// ```
#[derive(Debug, Clone)]
pub struct ProdigalGeneCaller {
    /// Executable name or path.
    pub program: PathBuf,
}

impl Default for ProdigalGeneCaller {
    fn default() -> Self {
        Self {
            program: PathBuf::from(TOOL),
        }
    }
}

impl ProdigalGeneCaller {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub(crate) fn command(&self, request: &GeneCallRequest<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-i")
            .arg(request.genome)
            .arg("-a")
            .arg(request.proteins)
            .arg("-g")
            .arg(request.table.to_string())
            .arg("-p")
            .arg(match request.procedure {
                Procedure::Single => "single",
                Procedure::Meta => "meta",
            })
            .arg("-q");
        cmd
    }
}

impl GeneCaller for ProdigalGeneCaller {
    fn name(&self) -> &str {
        TOOL
    }

    fn call(&self, request: &GeneCallRequest<'_>) -> Result<ToolOutcome, BinCheckError> {
        run_command(TOOL, self.command(request), request.proteins)
    }

    fn check_available(&self) -> Result<(), BinCheckError> {
        probe_executable(TOOL, &self.program, &["-v"])
    }
}
