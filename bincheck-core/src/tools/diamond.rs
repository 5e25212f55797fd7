use std::path::PathBuf;
use std::process::Command;

use super::{HomologySearcher, SearchRequest, ToolOutcome, probe_executable, run_command};
use crate::constants::{MAX_EVALUE, MIN_PERCENT_IDENTITY, MIN_QUERY_COVER, MIN_SUBJECT_COVER};
use crate::types::BinCheckError;

const TOOL: &str = "diamond";

/// Output columns requested from the aligner (BLAST tabular).
pub const OUTPUT_COLUMNS: [&str; 12] = [
    "qseqid", "sseqid", "pident", "length", "mismatch", "gapopen", "qstart", "qend", "sstart",
    "send", "evalue", "bitscore",
];

/// Homology searcher backed by a DIAMOND-compatible executable.
///
/// Only the best target per query is requested; ties left by the aligner
/// are resolved afterwards in [`crate::homology::HitTable`].
#[derive(Debug, Clone)]
pub struct DiamondSearcher {
    /// Executable name or path.
    pub program: PathBuf,
}

impl Default for DiamondSearcher {
    fn default() -> Self {
        Self {
            program: PathBuf::from(TOOL),
        }
    }
}

impl DiamondSearcher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub(crate) fn command(&self, request: &SearchRequest<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("blastp")
            .arg("--db")
            .arg(request.database)
            .arg("--query")
            .arg(request.query)
            .arg("--out")
            .arg(request.output)
            .arg("--outfmt")
            .arg("6")
            .args(OUTPUT_COLUMNS)
            .arg("--max-target-seqs")
            .arg("1")
            .arg("--query-cover")
            .arg(MIN_QUERY_COVER.to_string())
            .arg("--subject-cover")
            .arg(MIN_SUBJECT_COVER.to_string())
            .arg("--id")
            .arg(MIN_PERCENT_IDENTITY.to_string())
            .arg("--evalue")
            .arg(MAX_EVALUE.to_string())
            .arg("--threads")
            .arg(request.threads.to_string())
            .arg("--block-size")
            .arg(request.params.block_size.to_string())
            .arg("--index-chunks")
            .arg(request.params.index_chunks.to_string())
            .arg("--quiet");
        cmd
    }
}

impl HomologySearcher for DiamondSearcher {
    fn name(&self) -> &str {
        TOOL
    }

    fn search(&self, request: &SearchRequest<'_>) -> Result<ToolOutcome, BinCheckError> {
        run_command(TOOL, self.command(request), request.output)
    }

    fn check_available(&self) -> Result<(), BinCheckError> {
        probe_executable(TOOL, &self.program, &["version"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchParams;
    use std::path::Path;

    fn args_for(low_memory: bool) -> Vec<String> {
        let request = SearchRequest {
            query: Path::new("batch.faa"),
            database: Path::new("ref.dmnd"),
            output: Path::new("batch.tsv"),
            threads: 8,
            params: SearchParams::for_memory_mode(low_memory),
        };
        DiamondSearcher::default()
            .command(&request)
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn value_after(args: &[String], flag: &str) -> String {
        let index = args.iter().position(|a| a == flag).unwrap();
        args[index + 1].clone()
    }

    #[test]
    fn test_diamond_command_line() {
        let args = args_for(false);
        assert_eq!(args[0], "blastp");
        assert_eq!(value_after(&args, "--db"), "ref.dmnd");
        assert_eq!(value_after(&args, "--query"), "batch.faa");
        assert_eq!(value_after(&args, "--threads"), "8");
        assert_eq!(value_after(&args, "--max-target-seqs"), "1");
        assert_eq!(value_after(&args, "--block-size"), "2");
        assert!(args.iter().any(|a| a == "bitscore"));
    }

    #[test]
    fn test_low_memory_only_changes_block_parameters() {
        let normal = args_for(false);
        let low = args_for(true);
        assert_eq!(value_after(&low, "--block-size"), "0.5");
        assert_eq!(value_after(&low, "--index-chunks"), "4");

        let differing: Vec<_> = normal
            .iter()
            .zip(&low)
            .filter(|(a, b)| a != b)
            .map(|(a, _)| a.clone())
            .collect();
        assert_eq!(differing, ["2", "1"]);
    }
}
