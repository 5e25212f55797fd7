use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use bio::io::fasta;

use super::{GenomeStats, Protein, ProteinSet, base_counts};
use crate::types::BinCheckError;

/// Identifier, optional description and raw sequence of one FASTA record.
pub type FastaRecord = (String, Option<String>, Vec<u8>);

/// Reads every record of a FASTA file using rust-bio.
pub fn read_fasta_sequences<P: AsRef<Path>>(path: P) -> Result<Vec<FastaRecord>, BinCheckError> {
    let file = File::open(path.as_ref())?;
    let reader = fasta::Reader::new(file);
    let mut sequences = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| BinCheckError::ParseError(e.to_string()))?;
        let id = record.id().to_string();
        let description = record.desc().map(String::from);
        let seq = record.seq().to_vec();
        sequences.push((id, description, seq));
    }

    Ok(sequences)
}

/// Streams a nucleotide FASTA file into [`GenomeStats`] without keeping
/// the contigs in memory.
pub fn read_genome_stats<P: AsRef<Path>>(path: P) -> Result<GenomeStats, BinCheckError> {
    let file = File::open(path.as_ref())?;
    let reader = fasta::Reader::new(file);
    let mut lengths = Vec::new();
    let mut gc = 0u64;
    let mut acgt = 0u64;

    for result in reader.records() {
        let record = result.map_err(|e| BinCheckError::ParseError(e.to_string()))?;
        lengths.push(record.seq().len() as u64);
        let (contig_gc, contig_acgt) = base_counts(record.seq());
        gc += contig_gc;
        acgt += contig_acgt;
    }

    Ok(GenomeStats::from_parts(lengths, gc, acgt))
}

/// Reads predicted proteins.
///
/// Trailing stop symbols are dropped. Prodigal-style headers
/// (`>id # start # end # strand # attributes`) provide the gene span.
pub fn read_protein_set<P: AsRef<Path>>(path: P) -> Result<ProteinSet, BinCheckError> {
    let proteins = read_fasta_sequences(path)?
        .into_iter()
        .map(|(id, description, mut sequence)| {
            while sequence.last() == Some(&b'*') {
                sequence.pop();
            }
            Protein {
                id,
                coding_span: description.as_deref().and_then(parse_coding_span),
                sequence,
            }
        })
        .collect();

    Ok(ProteinSet { proteins })
}

/// Extracts the gene length from `# start # end # strand ...`.
fn parse_coding_span(description: &str) -> Option<u64> {
    let mut fields = description.split('#').map(str::trim).skip(1);
    let start: u64 = fields.next()?.parse().ok()?;
    let end: u64 = fields.next()?.parse().ok()?;
    (end >= start).then(|| end - start + 1)
}

/// Writes proteins under new identifiers produced by `rename`.
///
/// Used to build batched search queries where every protein id is
/// prefixed with its genome.
pub fn write_renamed_proteins<W, F>(
    writer: W,
    proteins: &ProteinSet,
    rename: F,
) -> Result<(), BinCheckError>
where
    W: Write,
    F: Fn(&str) -> String,
{
    let mut fasta_writer = fasta::Writer::new(writer);
    for protein in &proteins.proteins {
        fasta_writer.write(&rename(&protein.id), None, &protein.sequence)?;
    }
    fasta_writer.flush()?;
    Ok(())
}

/// Creates `path` and wraps it in a buffered writer.
pub(crate) fn create_buffered(path: &Path) -> Result<BufWriter<File>, BinCheckError> {
    Ok(BufWriter::new(File::create(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_fixture(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_fasta_sequences_basic() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "test.fna", b">test_sequence\nATCG\nGCTA\n");

        let sequences = read_fasta_sequences(&path).unwrap();
        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].0, "test_sequence");
        assert_eq!(sequences[0].2, b"ATCGGCTA");
    }

    #[test]
    fn test_read_fasta_sequences_with_description() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "desc.fna", b">seq1 This is a test\nATCG\n>seq2\nGCTA\n");

        let sequences = read_fasta_sequences(&path).unwrap();
        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].1, Some("This is a test".to_string()));
        assert_eq!(sequences[1].1, None);
    }

    #[test]
    fn test_read_fasta_sequences_file_not_found() {
        let result = read_fasta_sequences("nonexistent_file.fa");
        assert!(matches!(result, Err(BinCheckError::IoError(_))));
    }

    #[test]
    fn test_read_fasta_sequences_invalid_format() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "invalid.fna", b"not a fasta file\n");

        let result = read_fasta_sequences(&path);
        assert!(matches!(result, Err(BinCheckError::ParseError(_))));
    }

    #[test]
    fn test_read_genome_stats_matches_in_memory() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "genome.fna", b">c1\nGGCCAATT\nGG\n>c2\nATNN\n");

        let streamed = read_genome_stats(&path).unwrap();
        let contigs: Vec<&[u8]> = vec![b"GGCCAATTGG", b"ATNN"];
        let in_memory = GenomeStats::from_contigs(contigs);
        assert_eq!(streamed, in_memory);
    }

    #[test]
    fn test_read_protein_set_prodigal_headers() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "bin.faa",
            b">contig_1_1 # 3 # 14 # 1 # ID=1_1;partial=00\nMKV*\n>contig_1_2\nMKLA\n",
        );

        let set = read_protein_set(&path).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.proteins[0].id, "contig_1_1");
        assert_eq!(set.proteins[0].sequence, b"MKV");
        assert_eq!(set.proteins[0].coding_span, Some(12));
        assert_eq!(set.proteins[1].coding_span, None);
        assert_eq!(set.proteins[1].coding_bases(), 15);
    }

    #[test]
    fn test_parse_coding_span_rejects_garbage() {
        assert_eq!(parse_coding_span("# 10 # 1 # -1"), None);
        assert_eq!(parse_coding_span("hypothetical protein"), None);
        assert_eq!(parse_coding_span("# 1 # 300 # -1 # ID=2"), Some(300));
    }

    #[test]
    fn test_write_renamed_proteins() {
        let set = ProteinSet {
            proteins: vec![Protein {
                id: "p1".to_string(),
                sequence: b"MKV".to_vec(),
                coding_span: None,
            }],
        };
        let mut buffer = Vec::new();
        write_renamed_proteins(&mut buffer, &set, |id| format!("bin1|{id}")).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), ">bin1|p1\nMKV\n");
    }
}
