//! Genome and protein sequence handling.
//!
//! ## Overview
//!
//! Two kinds of FASTA input flow through the workflow:
//!
//! - nucleotide genomes (one file per bin, many contigs), summarised by
//!   [`GenomeStats`];
//! - predicted proteins ([`ProteinSet`]), summarised by [`CodingStats`]
//!   and consumed by the homology searcher and the composition features.
//!
//! ## Modules
//!
//! - [`io`]: FASTA reading and writing
//!
//! ## Examples
//!
//! ```rust
//! use bincheck_core::sequence::GenomeStats;
//!
//! let contigs: Vec<&[u8]> = vec![b"ATGCGC", b"AT"];
//! let stats = GenomeStats::from_contigs(contigs);
//!
//! assert_eq!(stats.genome_size, 8);
//! assert_eq!(stats.contig_count, 2);
//! assert_eq!(stats.contig_n50, 6);
//! ```

pub mod io;

pub use io::*;

use serde::Serialize;

use crate::constants::CODON_LENGTH;

/// Assembly statistics of a nucleotide genome.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GenomeStats {
    /// Total number of bases over all contigs.
    pub genome_size: u64,
    /// Fraction of G/C among unambiguous bases (0.0 to 1.0).
    pub gc_content: f64,
    /// Number of contigs.
    pub contig_count: u64,
    /// Contig N50 in base pairs.
    pub contig_n50: u64,
    /// Length of the longest contig.
    pub max_contig_length: u64,
}

impl GenomeStats {
    /// Computes statistics over contig sequences.
    pub fn from_contigs<'a, I>(contigs: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut lengths = Vec::new();
        let mut gc = 0u64;
        let mut acgt = 0u64;

        for contig in contigs {
            lengths.push(contig.len() as u64);
            let (contig_gc, contig_acgt) = base_counts(contig);
            gc += contig_gc;
            acgt += contig_acgt;
        }

        Self::from_parts(lengths, gc, acgt)
    }

    fn from_parts(mut lengths: Vec<u64>, gc: u64, acgt: u64) -> Self {
        let genome_size: u64 = lengths.iter().sum();
        lengths.sort_unstable_by(|a, b| b.cmp(a));

        let mut running = 0u64;
        let mut contig_n50 = 0u64;
        for &length in &lengths {
            running += length;
            if running * 2 >= genome_size {
                contig_n50 = length;
                break;
            }
        }

        Self {
            genome_size,
            gc_content: if acgt == 0 {
                0.0
            } else {
                gc as f64 / acgt as f64
            },
            contig_count: lengths.len() as u64,
            contig_n50,
            max_contig_length: lengths.first().copied().unwrap_or(0),
        }
    }
}

/// Counts G/C bases and unambiguous bases of one contig.
fn base_counts(contig: &[u8]) -> (u64, u64) {
    let mut gc = 0u64;
    let mut acgt = 0u64;
    for base in contig {
        match base.to_ascii_uppercase() {
            b'G' | b'C' => {
                gc += 1;
                acgt += 1;
            }
            b'A' | b'T' | b'U' => acgt += 1,
            _ => {}
        }
    }
    (gc, acgt)
}

/// One predicted protein.
#[derive(Debug, Clone, PartialEq)]
pub struct Protein {
    /// First word of the FASTA header; stable across runs.
    pub id: String,
    /// Amino-acid residues, stop symbol removed.
    pub sequence: Vec<u8>,
    /// Nucleotide span of the gene when the header carries coordinates.
    pub coding_span: Option<u64>,
}

impl Protein {
    /// Bases attributed to this gene, falling back to residues plus stop codon.
    #[must_use]
    pub fn coding_bases(&self) -> u64 {
        self.coding_span
            .unwrap_or((self.sequence.len() as u64 + 1) * CODON_LENGTH)
    }
}

/// Ordered predicted proteins of one genome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProteinSet {
    pub proteins: Vec<Protein>,
}

impl ProteinSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.proteins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proteins.is_empty()
    }

    /// Gene-level statistics; coding density needs the genome size and is
    /// `None` without one.
    #[must_use]
    pub fn coding_stats(&self, genome_size: Option<u64>) -> CodingStats {
        let coding_bases: u64 = self.proteins.iter().map(Protein::coding_bases).sum();
        let coding_sequences = self.proteins.len() as u64;
        CodingStats {
            coding_sequences,
            coding_bases,
            mean_gene_length: if coding_sequences == 0 {
                0.0
            } else {
                coding_bases as f64 / coding_sequences as f64
            },
            coding_density: genome_size
                .filter(|&size| size > 0)
                .map(|size| coding_bases as f64 / size as f64),
        }
    }
}

/// Gene-level statistics of a predicted protein set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CodingStats {
    pub coding_sequences: u64,
    pub coding_bases: u64,
    /// Mean gene length in base pairs.
    pub mean_gene_length: f64,
    /// Fraction of the genome covered by genes.
    pub coding_density: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protein(id: &str, residues: &str, span: Option<u64>) -> Protein {
        Protein {
            id: id.to_string(),
            sequence: residues.as_bytes().to_vec(),
            coding_span: span,
        }
    }

    #[test]
    fn test_genome_stats_basic() {
        let contigs: Vec<&[u8]> = vec![b"GGGGCCCCAA", b"ATAT", b"GCNN"];
        let stats = GenomeStats::from_contigs(contigs);

        assert_eq!(stats.genome_size, 18);
        assert_eq!(stats.contig_count, 3);
        assert_eq!(stats.max_contig_length, 10);
        assert_eq!(stats.contig_n50, 10);
        // 10 G/C out of 16 unambiguous bases
        assert!((stats.gc_content - 10.0 / 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_genome_stats_n50_multiple_contigs() {
        let a = vec![b'A'; 50];
        let b = vec![b'A'; 30];
        let c = vec![b'A'; 20];
        let stats = GenomeStats::from_contigs([a.as_slice(), b.as_slice(), c.as_slice()]);
        assert_eq!(stats.contig_n50, 50);

        let stats = GenomeStats::from_contigs([c.as_slice(), b.as_slice(), b.as_slice()]);
        // 30 + 30 = 60 >= 80 / 2
        assert_eq!(stats.contig_n50, 30);
    }

    #[test]
    fn test_genome_stats_empty() {
        let stats = GenomeStats::from_contigs(Vec::<&[u8]>::new());
        assert_eq!(stats, GenomeStats::default());
    }

    #[test]
    fn test_coding_stats_with_spans() {
        let set = ProteinSet {
            proteins: vec![protein("a", "MKV", Some(12)), protein("b", "MK", Some(9))],
        };
        let stats = set.coding_stats(Some(42));
        assert_eq!(stats.coding_sequences, 2);
        assert_eq!(stats.coding_bases, 21);
        assert!((stats.mean_gene_length - 10.5).abs() < 1e-12);
        assert!((stats.coding_density.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_coding_stats_without_spans() {
        let set = ProteinSet {
            proteins: vec![protein("a", "MKV", None)],
        };
        let stats = set.coding_stats(None);
        assert_eq!(stats.coding_bases, 12);
        assert!(stats.coding_density.is_none());
    }

    #[test]
    fn test_coding_stats_empty_set() {
        let stats = ProteinSet::default().coding_stats(Some(100));
        assert_eq!(stats.coding_sequences, 0);
        assert_eq!(stats.mean_gene_length, 0.0);
        assert_eq!(stats.coding_density, Some(0.0));
    }
}
