//! Amino-acid composition and similarity to reference centroids.

use std::io::Read;
use std::path::Path;

use crate::constants::AMINO_ACIDS;
use crate::sequence::ProteinSet;
use crate::types::BinCheckError;

/// Frequencies of the 20 standard residues, in [`AMINO_ACIDS`] order.
pub type Frequencies = [f64; 20];

fn residue_index(residue: u8) -> Option<usize> {
    AMINO_ACIDS
        .iter()
        .position(|&aa| aa == residue.to_ascii_uppercase())
}

/// Residue counts over a genome's predicted proteins.
///
/// Ambiguous and non-standard residues (`X`, `B`, `Z`, `U`, ...) are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AminoAcidComposition {
    counts: [u64; 20],
}

impl AminoAcidComposition {
    #[must_use]
    pub fn from_proteins(proteins: &ProteinSet) -> Self {
        let mut counts = [0u64; 20];
        for protein in &proteins.proteins {
            for &residue in &protein.sequence {
                if let Some(index) = residue_index(residue) {
                    counts[index] += 1;
                }
            }
        }
        Self { counts }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Normalised frequencies; `None` when no standard residue was seen.
    #[must_use]
    pub fn frequencies(&self) -> Option<Frequencies> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let mut frequencies = [0.0; 20];
        for (slot, &count) in frequencies.iter_mut().zip(&self.counts) {
            *slot = count as f64 / total as f64;
        }
        Some(frequencies)
    }
}

/// Cosine similarity; `0.0` when either vector has zero norm.
///
/// # Examples
///
/// ```rust
/// use bincheck_core::composition::cosine_similarity;
///
/// assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-12);
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
/// assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
/// ```
#[must_use]
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Named reference composition centroids.
///
/// Loaded once from `aa_reference.tsv`: a `reference` column followed by
/// one column per standard residue (column order is free).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceComposition {
    centroids: Vec<(String, Frequencies)>,
}

impl ReferenceComposition {
    /// # Errors
    ///
    /// Returns [`BinCheckError::InvalidConfig`] for a missing residue column,
    /// non-numeric values, duplicate names or an empty table.
    pub fn from_path(path: &Path) -> Result<Self, BinCheckError> {
        let file = std::fs::File::open(path).map_err(|e| {
            BinCheckError::InvalidConfig(format!("{}: {e}", path.display()))
        })?;
        Self::from_reader(file)
            .map_err(|e| BinCheckError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, BinCheckError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| BinCheckError::InvalidConfig(format!("missing column {name}")))
        };
        let name_column = column("reference")?;
        let residue_columns = AMINO_ACIDS
            .iter()
            .map(|&aa| column(&char::from(aa).to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut centroids: Vec<(String, Frequencies)> = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let name = record.get(name_column).unwrap_or_default().to_string();
            if name.is_empty() || centroids.iter().any(|(existing, _)| *existing == name) {
                return Err(BinCheckError::InvalidConfig(format!(
                    "reference name '{name}' is empty or duplicated"
                )));
            }
            let mut frequencies = [0.0; 20];
            for (slot, &index) in frequencies.iter_mut().zip(&residue_columns) {
                let raw = record.get(index).unwrap_or_default();
                *slot = raw.parse::<f64>().map_err(|e| {
                    BinCheckError::InvalidConfig(format!("reference {name}: '{raw}': {e}"))
                })?;
            }
            centroids.push((name, frequencies));
        }

        if centroids.is_empty() {
            return Err(BinCheckError::InvalidConfig(
                "reference composition table is empty".to_string(),
            ));
        }
        Ok(Self { centroids })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.centroids.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.centroids.iter().any(|(n, _)| n == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    /// Similarity of `frequencies` to every centroid, in table order.
    #[must_use]
    pub fn similarities(&self, frequencies: &Frequencies) -> Vec<(String, f64)> {
        self.centroids
            .iter()
            .map(|(name, centroid)| (name.clone(), cosine_similarity(frequencies, centroid)))
            .collect()
    }
}
