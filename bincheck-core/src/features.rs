//! Canonical feature schema and per-genome feature vectors.
//!
//! ## Overview
//!
//! The schema file (`feature_schema.json`) lists feature names in the order
//! the models were trained on. Every name belongs to one namespace:
//!
//! | Name                    | Value                                          |
//! |-------------------------|------------------------------------------------|
//! | `stat:<statistic>`      | genome or gene statistic, see [`Statistic`]    |
//! | `aa:<residue>`          | normalised amino-acid frequency                |
//! | `module:<id>`           | module completeness in `[0, 1]`                |
//! | `ortholog:<accession>`  | proteins whose best hit maps to the accession  |
//! | `cosine:max`            | highest similarity to a reference centroid     |
//! | `cosine:mean`           | mean similarity over reference centroids       |
//! | `cosine:ref:<name>`     | similarity to one named centroid               |
//!
//! Names are resolved into [`FeatureKey`]s once at startup; unknown
//! namespaces, modules or centroids abort the run.
//!
//! ## Examples
//!
//! ```rust
//! use bincheck_core::features::{FeatureKey, Statistic};
//!
//! assert_eq!(FeatureKey::parse("stat:gc_content")?, FeatureKey::Stat(Statistic::GcContent));
//! assert_eq!(FeatureKey::parse("aa:W")?, FeatureKey::AminoAcid(18));
//! assert!(FeatureKey::parse("kmer:AAAA").is_err());
//! # Ok::<(), bincheck_core::types::BinCheckError>(())
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, ModuleCompleteness, ModuleSchema};
use crate::composition::{AminoAcidComposition, ReferenceComposition};
use crate::constants::AMINO_ACIDS;
use crate::sequence::{CodingStats, GenomeStats};
use crate::types::BinCheckError;

/// Genome and gene statistics usable as features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    GenomeSize,
    GcContent,
    ContigCount,
    ContigN50,
    MaxContigLength,
    CodingDensity,
    MeanGeneLength,
    CodingSequences,
}

impl Statistic {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "genome_size" => Self::GenomeSize,
            "gc_content" => Self::GcContent,
            "contig_count" => Self::ContigCount,
            "contig_n50" => Self::ContigN50,
            "max_contig_length" => Self::MaxContigLength,
            "coding_density" => Self::CodingDensity,
            "mean_gene_length" => Self::MeanGeneLength,
            "coding_sequences" => Self::CodingSequences,
            _ => return None,
        })
    }

    /// Nucleotide statistics are undefined when the input was proteins.
    fn value(self, genome: Option<&GenomeStats>, coding: &CodingStats) -> Option<f64> {
        match self {
            Self::GenomeSize => genome.map(|g| g.genome_size as f64),
            Self::GcContent => genome.map(|g| g.gc_content),
            Self::ContigCount => genome.map(|g| g.contig_count as f64),
            Self::ContigN50 => genome.map(|g| g.contig_n50 as f64),
            Self::MaxContigLength => genome.map(|g| g.max_contig_length as f64),
            Self::CodingDensity => coding.coding_density,
            Self::MeanGeneLength => Some(coding.mean_gene_length),
            Self::CodingSequences => Some(coding.coding_sequences as f64),
        }
    }
}

/// Resolved meaning of one schema entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureKey {
    Stat(Statistic),
    /// Index into [`AMINO_ACIDS`].
    AminoAcid(usize),
    Module(String),
    Ortholog(String),
    CosineMax,
    CosineMean,
    CosineReference(String),
}

impl FeatureKey {
    /// # Errors
    ///
    /// Returns [`BinCheckError::InvalidConfig`] for an unknown namespace,
    /// statistic or residue.
    pub fn parse(name: &str) -> Result<Self, BinCheckError> {
        let unknown = || BinCheckError::InvalidConfig(format!("unknown feature '{name}'"));
        let (namespace, rest) = name.split_once(':').ok_or_else(unknown)?;
        match namespace {
            "stat" => Statistic::parse(rest).map(Self::Stat).ok_or_else(unknown),
            "aa" => match rest.as_bytes() {
                [residue] => AMINO_ACIDS
                    .iter()
                    .position(|aa| aa == residue)
                    .map(Self::AminoAcid)
                    .ok_or_else(unknown),
                _ => Err(unknown()),
            },
            "module" if !rest.is_empty() => Ok(Self::Module(rest.to_string())),
            "ortholog" if !rest.is_empty() => Ok(Self::Ortholog(rest.to_string())),
            "cosine" => match rest.split_once(':') {
                None if rest == "max" => Ok(Self::CosineMax),
                None if rest == "mean" => Ok(Self::CosineMean),
                Some(("ref", reference)) if !reference.is_empty() => {
                    Ok(Self::CosineReference(reference.to_string()))
                }
                _ => Err(unknown()),
            },
            _ => Err(unknown()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    version: String,
    features: Vec<String>,
}

/// Ordered feature names shared by every genome and both models.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    version: String,
    names: Vec<String>,
    keys: Vec<FeatureKey>,
}

impl FeatureSchema {
    /// Loads and resolves `feature_schema.json`.
    ///
    /// # Errors
    ///
    /// Returns [`BinCheckError::InvalidConfig`] for an unreadable file, an
    /// empty or duplicated feature list, or an unknown feature name.
    pub fn from_path(path: &Path) -> Result<Self, BinCheckError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BinCheckError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, BinCheckError> {
        let file: SchemaFile = serde_json::from_str(text)
            .map_err(|e| BinCheckError::InvalidConfig(format!("feature schema: {e}")))?;
        Self::new(file.version, file.features)
    }

    pub fn new(version: String, names: Vec<String>) -> Result<Self, BinCheckError> {
        if names.is_empty() {
            return Err(BinCheckError::InvalidConfig(
                "feature schema lists no features".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(duplicate) = names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(BinCheckError::InvalidConfig(format!(
                "feature '{duplicate}' listed twice"
            )));
        }
        let keys = names
            .iter()
            .map(|name| FeatureKey::parse(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            version,
            names,
            keys,
        })
    }

    /// Checks that every module and centroid the schema names exists.
    ///
    /// # Errors
    ///
    /// Returns [`BinCheckError::InvalidConfig`] naming the first unknown entry.
    pub fn check_sources(
        &self,
        modules: &ModuleSchema,
        reference: &ReferenceComposition,
    ) -> Result<(), BinCheckError> {
        for key in &self.keys {
            match key {
                FeatureKey::Module(module) if !modules.contains(module) => {
                    return Err(BinCheckError::InvalidConfig(format!(
                        "feature schema names unknown module {module}"
                    )));
                }
                FeatureKey::CosineReference(name) if !reference.contains(name) => {
                    return Err(BinCheckError::InvalidConfig(format!(
                        "feature schema names unknown reference centroid {name}"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Assembles the vector for one genome in schema order.
    #[must_use]
    pub fn build(&self, inputs: &FeatureInputs<'_>) -> FeatureVector {
        let frequencies = inputs.composition.frequencies();
        let values = self
            .keys
            .iter()
            .map(|key| match key {
                FeatureKey::Stat(stat) => stat.value(inputs.genome, inputs.coding),
                FeatureKey::AminoAcid(index) => frequencies.map(|f| f[*index]),
                FeatureKey::Module(module) => inputs.modules.get(module),
                FeatureKey::Ortholog(accession) => {
                    Some(f64::from(inputs.annotation.count(accession)))
                }
                FeatureKey::CosineMax => inputs.cosine.max,
                FeatureKey::CosineMean => inputs.cosine.mean,
                FeatureKey::CosineReference(name) => inputs.cosine.get(name),
            })
            .collect();
        FeatureVector { values }
    }
}

/// Everything the builder reads for one genome.
#[derive(Debug, Clone, Copy)]
pub struct FeatureInputs<'a> {
    /// `None` when the input was already proteins.
    pub genome: Option<&'a GenomeStats>,
    pub coding: &'a CodingStats,
    pub composition: &'a AminoAcidComposition,
    pub modules: &'a ModuleCompleteness,
    pub annotation: &'a Annotation,
    pub cosine: &'a CosineSummary,
}

/// Similarity of one genome's composition to the reference centroids.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CosineSummary {
    /// Per-centroid similarity, in reference table order.
    pub per_reference: Vec<(String, f64)>,
    /// Undefined for a genome without standard residues.
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl CosineSummary {
    #[must_use]
    pub fn compute(composition: &AminoAcidComposition, reference: &ReferenceComposition) -> Self {
        let Some(frequencies) = composition.frequencies() else {
            return Self::default();
        };
        let per_reference = reference.similarities(&frequencies);
        let max = per_reference.iter().map(|(_, s)| *s).reduce(f64::max);
        let mean = (!per_reference.is_empty()).then(|| {
            per_reference.iter().map(|(_, s)| s).sum::<f64>() / per_reference.len() as f64
        });
        Self {
            per_reference,
            max,
            mean,
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.per_reference
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| *s)
    }
}

/// Values of one genome in schema order; `None` marks an undefined feature.
///
/// Arity always equals the schema length. Models substitute their own
/// missing value when scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: Vec<Option<f64>>,
}

impl FeatureVector {
    #[must_use]
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Dense copy with undefined entries replaced by `missing`.
    #[must_use]
    pub fn impute(&self, missing: f64) -> Vec<f64> {
        self.values.iter().map(|v| v.unwrap_or(missing)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::homology::{Hit, HitTable};
    use crate::sequence::{Protein, ProteinSet};

    fn reference() -> ReferenceComposition {
        let header: Vec<String> = AMINO_ACIDS.iter().map(|&aa| char::from(aa).to_string()).collect();
        let mut alanine = vec!["0"; 20];
        alanine[0] = "1";
        let mut cysteine = vec!["0"; 20];
        cysteine[1] = "1";
        let table = format!(
            "reference\t{}\nala\t{}\ncys\t{}\n",
            header.join("\t"),
            alanine.join("\t"),
            cysteine.join("\t")
        );
        ReferenceComposition::from_reader(table.as_bytes()).unwrap()
    }

    fn modules() -> ModuleSchema {
        ModuleSchema::from_reader("module\tstep\taccession\nM1\ta\tK1\nM1\tb\tK2\n".as_bytes())
            .unwrap()
    }

    fn schema() -> FeatureSchema {
        let names = [
            "stat:genome_size",
            "stat:coding_density",
            "stat:coding_sequences",
            "aa:A",
            "module:M1",
            "ortholog:K1",
            "cosine:max",
            "cosine:mean",
            "cosine:ref:cys",
        ];
        FeatureSchema::new("1".into(), names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_parse_feature_names() {
        assert_eq!(FeatureKey::parse("module:M00001").unwrap(), FeatureKey::Module("M00001".into()));
        assert_eq!(FeatureKey::parse("cosine:ref:gut").unwrap(), FeatureKey::CosineReference("gut".into()));
        for bad in ["stat:size", "aa:J", "aa:AA", "module:", "cosine:min", "cosine:ref:", "plain"] {
            assert!(FeatureKey::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_schema_rejects_duplicates_and_unknown_sources() {
        let dup = FeatureSchema::new("1".into(), vec!["aa:A".into(), "aa:A".into()]);
        assert!(matches!(dup, Err(BinCheckError::InvalidConfig(_))));

        let unknown_module = FeatureSchema::new("1".into(), vec!["module:M9".into()]).unwrap();
        assert!(unknown_module.check_sources(&modules(), &reference()).is_err());
        let unknown_ref = FeatureSchema::new("1".into(), vec!["cosine:ref:gut".into()]).unwrap();
        assert!(unknown_ref.check_sources(&modules(), &reference()).is_err());
        assert!(schema().check_sources(&modules(), &reference()).is_ok());
    }

    #[test]
    fn test_schema_from_json() {
        let schema = FeatureSchema::from_json(r#"{"version": "2.1", "features": ["aa:C", "cosine:max"]}"#).unwrap();
        assert_eq!(schema.version(), "2.1");
        assert_eq!(schema.len(), 2);
        assert!(FeatureSchema::from_json(r#"{"version": "2.1"}"#).is_err());
    }

    #[test]
    fn test_build_vector_in_schema_order() {
        let proteins = ProteinSet {
            proteins: vec![Protein {
                id: "p1".into(),
                sequence: b"AAAC".to_vec(),
                coding_span: Some(15),
            }],
        };
        let mut hits = HitTable::default();
        hits.insert(
            "p1".into(),
            Hit {
                target: "U~K1".into(),
                identity: 90.0,
                evalue: 1e-50,
                bitscore: 200.0,
            },
        );
        let annotation = Annotation::from_hits(&hits);
        let completeness = modules().completeness(&annotation);
        let composition = AminoAcidComposition::from_proteins(&proteins);
        let cosine = CosineSummary::compute(&composition, &reference());
        let coding = proteins.coding_stats(None);

        let vector = schema().build(&FeatureInputs {
            genome: None,
            coding: &coding,
            composition: &composition,
            modules: &completeness,
            annotation: &annotation,
            cosine: &cosine,
        });

        assert_eq!(vector.len(), schema().len());
        let v = vector.values();
        assert_eq!(v[0], None);
        assert_eq!(v[1], None);
        assert_eq!(v[2], Some(1.0));
        assert_eq!(v[3], Some(0.75));
        assert_eq!(v[4], Some(0.5));
        assert_eq!(v[5], Some(1.0));
        // (0.75, 0.25) against unit vectors
        let norm = (0.75f64 * 0.75 + 0.25 * 0.25).sqrt();
        assert!((v[6].unwrap() - 0.75 / norm).abs() < 1e-12);
        assert!((v[7].unwrap() - 0.5 / norm).abs() < 1e-12);
        assert!((v[8].unwrap() - 0.25 / norm).abs() < 1e-12);

        assert_eq!(vector.impute(-1.0)[0], -1.0);
    }

    #[test]
    fn test_cosine_summary_without_residues() {
        let summary = CosineSummary::compute(&AminoAcidComposition::default(), &reference());
        assert!(summary.per_reference.is_empty());
        assert_eq!(summary.max, None);
        assert_eq!(summary.get("ala"), None);
    }

    #[test]
    fn test_vector_serializes_nulls() {
        let vector = FeatureVector::new(vec![Some(0.5), None]);
        assert_eq!(serde_json::to_string(&vector).unwrap(), "[0.5,null]");
    }
}
