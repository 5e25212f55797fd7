// =============================================================================
// =============================================================================

/// Version string for bincheck
pub const VERSION: &str = "0.3.0";

// =============================================================================
// Gene calling
// =============================================================================

/// Genetic codes accepted for `--ttable`
pub const ALLOWED_TRANSLATION_TABLES: [u8; 25] = [
    1, 2, 3, 4, 5, 6, 9, 10, 11, 12, 13, 14, 16, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 33,
];

/// Genomes shorter than this are called in metagenomic procedure
pub const MIN_SINGLE_PROCEDURE_LENGTH: u64 = 100_000;

/// Minimum coding-density gain of table 4 over table 11 to prefer table 4
pub const TABLE4_DENSITY_GAIN: f64 = 0.05;

/// Table 4 is only considered when table 11 density is below this
pub const TABLE11_DENSITY_CEILING: f64 = 0.7;

/// Length of a codon in base pairs
pub const CODON_LENGTH: u64 = 3;

// =============================================================================
// Homology search
// =============================================================================

/// Separator between genome and protein identifiers in batched queries
pub const GENOME_DELIMITER: char = 'Ω';

/// Separator between reference id and functional accession in target ids
pub const ACCESSION_DELIMITER: char = '~';

/// Genomes concatenated into one search invocation
pub const DEFAULT_SEARCH_BATCH_SIZE: usize = 1000;

/// Search block size (billions of letters) in normal mode
pub const BLOCK_SIZE: f64 = 2.0;

/// Search block size in low-memory mode
pub const LOW_MEMORY_BLOCK_SIZE: f64 = 0.5;

/// Index chunks in normal mode
pub const INDEX_CHUNKS: u32 = 1;

/// Index chunks in low-memory mode
pub const LOW_MEMORY_INDEX_CHUNKS: u32 = 4;

pub const MIN_QUERY_COVER: u32 = 80;
pub const MIN_SUBJECT_COVER: u32 = 80;
pub const MIN_PERCENT_IDENTITY: u32 = 30;
pub const MAX_EVALUE: f64 = 1e-5;

/// Number of columns in BLAST tabular (outfmt 6) rows
pub const HIT_TABLE_COLUMNS: usize = 12;

// =============================================================================
// Features and models
// =============================================================================

/// Standard amino acids in feature order
pub const AMINO_ACIDS: [u8; 20] = *b"ACDEFGHIKLMNPQRSTVWY";

/// Upper bound of a biologically sane completeness estimate
pub const MAX_COMPLETENESS: f64 = 100.0;

// =============================================================================
// File layout
// =============================================================================

pub const FEATURE_SCHEMA_FILE: &str = "feature_schema.json";
pub const MODULE_DEFINITIONS_FILE: &str = "module_definitions.tsv";
pub const AA_REFERENCE_FILE: &str = "aa_reference.tsv";
pub const GENERAL_MODEL_FILE: &str = "general_model.json";
pub const SPECIFIC_MODEL_FILE: &str = "specific_model.json";

pub const PROTEIN_DIR: &str = "protein_files";
pub const SEARCH_DIR: &str = "diamond_output";
pub const DEBUG_DIR: &str = "debug";
pub const REPORT_FILE: &str = "quality_report.tsv";
pub const LOG_FILE: &str = "bincheck.log";

pub const PROTEIN_EXTENSION: &str = "faa";
pub const HIT_TABLE_EXTENSION: &str = "tsv";
pub const GENE_CALL_RECORD_EXTENSION: &str = "json";

/// Self-test genomes inside the data directory
pub const TESTRUN_DIR: &str = "testrun";
pub const TESTRUN_MANIFEST: &str = "expected.tsv";
pub const TESTRUN_EXTENSION: &str = "tst";
