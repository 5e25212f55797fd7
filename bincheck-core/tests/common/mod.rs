#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bincheck_core::config::PipelineConfig;
use bincheck_core::constants::GENOME_DELIMITER;
use bincheck_core::pipeline::Predictor;
use bincheck_core::sequence::read_fasta_sequences;
use bincheck_core::tools::{
    GeneCallRequest, GeneCaller, HomologySearcher, SearchRequest, ToolOutcome,
};
use bincheck_core::types::BinCheckError;
use tempfile::TempDir;

pub const FEATURES: [&str; 11] = [
    "stat:genome_size",
    "stat:coding_density",
    "aa:A",
    "aa:C",
    "aa:G",
    "aa:T",
    "module:M1",
    "module:M2",
    "ortholog:K1",
    "cosine:max",
    "cosine:ref:gc_rich",
];

/// Index of `module:M1` in [`FEATURES`].
const M1: usize = 6;

/// Writes schema, module definitions, reference centroids and both models.
///
/// General model: completeness 50, plus 40 when M1 is more than half
/// complete; contamination 2. Specific model: completeness is M1 × 100,
/// contamination 1; trained for cosine similarity >= 0.9.
pub fn write_data_dir(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    let features: Vec<String> = FEATURES.iter().map(|f| format!("\"{f}\"")).collect();
    fs::write(
        dir.join("feature_schema.json"),
        format!("{{\"version\": \"1\", \"features\": [{}]}}", features.join(", ")),
    )
    .unwrap();

    fs::write(
        dir.join("module_definitions.tsv"),
        "module\tstep\taccession\nM1\ts1\tK1\nM1\ts2\tK2\nM2\ts1\tK3\n",
    )
    .unwrap();

    let residues = "ACDEFGHIKLMNPQRSTVWY";
    let row = |name: &str, weights: &[(char, &str)]| {
        let values: Vec<&str> = residues
            .chars()
            .map(|aa| {
                weights
                    .iter()
                    .find(|(r, _)| *r == aa)
                    .map_or("0", |(_, w)| *w)
            })
            .collect();
        format!("{name}\t{}\n", values.join("\t"))
    };
    let header: Vec<String> = residues.chars().map(String::from).collect();
    let mut reference = format!("reference\t{}\n", header.join("\t"));
    reference.push_str(&row("at_rich", &[('A', "0.5"), ('T', "0.5")]));
    reference.push_str(&row("gc_rich", &[('G', "0.5"), ('C', "0.5")]));
    fs::write(dir.join("aa_reference.tsv"), reference).unwrap();

    write_general_model(dir, "1");

    let n = FEATURES.len();
    let zeros = vec!["0.0"; n].join(", ");
    let ones = vec!["1.0"; n].join(", ");
    let mut completeness = vec!["0.0"; n];
    completeness[M1] = "1.0";
    fs::write(
        dir.join("specific_model.json"),
        format!(
            r#"{{
                "schema_version": "1",
                "n_features": {n},
                "missing_value": 0.0,
                "scaler": {{"mean": [{zeros}], "scale": [{ones}]}},
                "layers": [{{
                    "weights": [[{}], [{zeros}]],
                    "bias": [0.0, 0.01],
                    "activation": "linear"
                }}],
                "output_scale": 100.0,
                "min_cosine_similarity": 0.9
            }}"#,
            completeness.join(", ")
        ),
    )
    .unwrap();
}

pub fn write_general_model(dir: &Path, schema_version: &str) {
    fs::write(
        dir.join("general_model.json"),
        format!(
            r#"{{
                "schema_version": "{schema_version}",
                "n_features": {},
                "missing_value": -1.0,
                "completeness": {{"base_score": 50.0, "trees": [{{"nodes": [
                    {{"feature": {M1}, "threshold": 0.5, "left": 1, "right": 2}},
                    {{"leaf": 0.0}},
                    {{"leaf": 40.0}}
                ]}}]}},
                "contamination": {{"base_score": 2.0, "trees": []}}
            }}"#,
            FEATURES.len()
        ),
    )
    .unwrap();
}

/// Gene caller stand-in: one protein per contig, named after the contig,
/// made of the first third of its bases. Genomes with a contig named
/// `FAIL` make the caller exit non-zero.
#[derive(Clone, Default)]
pub struct ContigGeneCaller {
    pub calls: Arc<AtomicUsize>,
}

impl GeneCaller for ContigGeneCaller {
    fn name(&self) -> &str {
        "contig-caller"
    }

    fn call(&self, request: &GeneCallRequest<'_>) -> Result<ToolOutcome, BinCheckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let records = read_fasta_sequences(request.genome)?;
        let failed = records.iter().any(|(id, _, _)| id == "FAIL");
        if !failed {
            let mut out = String::new();
            for (id, _, seq) in records {
                let residues = seq.len() / 3;
                out.push_str(&format!(
                    ">{id} # 1 # {} # 1 # ID=1\n{}*\n",
                    residues * 3,
                    String::from_utf8_lossy(&seq[..residues])
                ));
            }
            fs::write(request.proteins, out)?;
        }
        Ok(ToolOutcome {
            exit_code: Some(if failed { 1 } else { 0 }),
            output: request.proteins.to_path_buf(),
            stderr: if failed { "bad genome".into() } else { String::new() },
        })
    }
}

/// Aligner stand-in: proteins named `K<n>` hit `UniRef90_K<n>~K<n>`, all
/// others miss. A query containing a protein named `BAD` fails.
#[derive(Clone, Default)]
pub struct AccessionSearcher {
    pub searches: Arc<AtomicUsize>,
    pub queried_genomes: Arc<AtomicUsize>,
}

impl HomologySearcher for AccessionSearcher {
    fn name(&self) -> &str {
        "accession-searcher"
    }

    fn search(&self, request: &SearchRequest<'_>) -> Result<ToolOutcome, BinCheckError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let records = read_fasta_sequences(request.query)?;
        let mut genomes: Vec<&str> = records
            .iter()
            .filter_map(|(id, _, _)| id.split(GENOME_DELIMITER).next())
            .collect();
        genomes.dedup();
        self.queried_genomes.fetch_add(genomes.len(), Ordering::SeqCst);

        let failed = records
            .iter()
            .any(|(id, _, _)| id.ends_with(&format!("{GENOME_DELIMITER}BAD")));
        if !failed {
            let mut out = String::new();
            for (id, _, _) in &records {
                let Some((_, protein)) = id.split_once(GENOME_DELIMITER) else {
                    continue;
                };
                if protein.starts_with('K') {
                    out.push_str(&format!(
                        "{id}\tUniRef90_{protein}~{protein}\t80.0\t100\t0\t0\t1\t100\t1\t100\t1e-30\t200.0\n"
                    ));
                }
            }
            fs::write(request.output, out)?;
        }
        Ok(ToolOutcome {
            exit_code: Some(if failed { 2 } else { 0 }),
            output: request.output.to_path_buf(),
            stderr: String::new(),
        })
    }
}

/// Repeats `unit` up to `length` bases.
pub fn bases(unit: &str, length: usize) -> String {
    unit.chars().cycle().take(length).collect()
}

/// Writes a nucleotide FASTA with the given `(contig, sequence)` records.
pub fn write_genome(dir: &Path, file: &str, contigs: &[(&str, String)]) -> PathBuf {
    let path = dir.join(file);
    let content: String = contigs
        .iter()
        .map(|(id, seq)| format!(">{id}\n{seq}\n"))
        .collect();
    fs::write(&path, content).unwrap();
    path
}

/// Test workspace: data directory, database file and input genomes.
pub struct Fixture {
    pub dir: TempDir,
    pub caller: ContigGeneCaller,
    pub searcher: AccessionSearcher,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        write_data_dir(&dir.path().join("data"));
        fs::write(dir.path().join("reference.dmnd"), b"stand-in database").unwrap();
        fs::create_dir(dir.path().join("bins")).unwrap();
        Self {
            dir,
            caller: ContigGeneCaller::default(),
            searcher: AccessionSearcher::default(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn bins(&self) -> PathBuf {
        self.path().join("bins")
    }

    /// AT-only proteins covering all of module M1: routed to the specific model.
    pub fn add_at_rich(&self) -> PathBuf {
        write_genome(
            &self.bins(),
            "bin_at.fna",
            &[("K1", bases("AT", 300)), ("K2", bases("TA", 600))],
        )
    }

    /// Mixed composition covering half of M1: routed to the general model.
    pub fn add_mixed(&self) -> PathBuf {
        write_genome(
            &self.bins(),
            "bin_mixed.fna",
            &[("K1", bases("ACGT", 1200)), ("X9", bases("GATC", 900))],
        )
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            threads: 2,
            database: self.path().join("reference.dmnd"),
            data_dir: self.path().join("data"),
            ..Default::default()
        }
    }

    pub fn predictor(&self, config: PipelineConfig) -> Predictor {
        Predictor::new(
            config,
            Box::new(self.caller.clone()),
            Box::new(self.searcher.clone()),
        )
        .unwrap()
    }

    pub fn gene_calls(&self) -> usize {
        self.caller.calls.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> usize {
        self.searcher.searches.load(Ordering::SeqCst)
    }

    pub fn searched_genomes(&self) -> usize {
        self.searcher.queried_genomes.load(Ordering::SeqCst)
    }
}
