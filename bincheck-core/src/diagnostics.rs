//! Optional per-genome debug artifacts.
//!
//! Writing these only reads values already computed for scoring.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::DebugFlags;
use crate::constants::DEBUG_DIR;
use crate::features::{CosineSummary, FeatureSchema, FeatureVector};
use crate::sequence::io::create_buffered;
use crate::types::BinCheckError;

const COSINE_DIR: &str = "cosine";
const VECTOR_DIR: &str = "feature_vectors";

#[derive(Serialize)]
struct VectorDump<'a> {
    genome: &'a str,
    schema_version: &'a str,
    features: &'a [String],
    values: &'a FeatureVector,
}

/// Writes debug artifacts under `<output>/debug/`.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    flags: DebugFlags,
    root: PathBuf,
}

impl Diagnostics {
    /// Creates the enabled debug directories.
    pub fn new(flags: DebugFlags, output_dir: &Path) -> Result<Self, BinCheckError> {
        let root = output_dir.join(DEBUG_DIR);
        if flags.cosine {
            std::fs::create_dir_all(root.join(COSINE_DIR))?;
        }
        if flags.vectors {
            std::fs::create_dir_all(root.join(VECTOR_DIR))?;
        }
        Ok(Self { flags, root })
    }

    #[must_use]
    pub fn cosine_path(&self, genome_id: &str) -> PathBuf {
        self.root.join(COSINE_DIR).join(format!("{genome_id}.tsv"))
    }

    #[must_use]
    pub fn vector_path(&self, genome_id: &str) -> PathBuf {
        self.root.join(VECTOR_DIR).join(format!("{genome_id}.json"))
    }

    /// Raw similarity to every centroid followed by the summary values.
    pub fn record_cosine(&self, genome_id: &str, cosine: &CosineSummary) -> Result<(), BinCheckError> {
        if !self.flags.cosine {
            return Ok(());
        }
        let mut writer = create_buffered(&self.cosine_path(genome_id))?;
        writeln!(writer, "reference\tcosine_similarity")?;
        for (name, similarity) in &cosine.per_reference {
            writeln!(writer, "{name}\t{similarity}")?;
        }
        writeln!(writer, "max\t{}", format_optional(cosine.max))?;
        writeln!(writer, "mean\t{}", format_optional(cosine.mean))?;
        writer.flush()?;
        Ok(())
    }

    pub fn record_vector(
        &self,
        genome_id: &str,
        schema: &FeatureSchema,
        vector: &FeatureVector,
    ) -> Result<(), BinCheckError> {
        if !self.flags.vectors {
            return Ok(());
        }
        let mut writer = create_buffered(&self.vector_path(genome_id))?;
        let dump = VectorDump {
            genome: genome_id,
            schema_version: schema.version(),
            features: schema.names(),
            values: vector,
        };
        serde_json::to_writer_pretty(&mut writer, &dump)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "NA".to_string(), |v| v.to_string())
}
