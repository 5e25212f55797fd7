//! Homology search over batches of genomes and per-genome hit tables.
//!
//! Proteins of many genomes are concatenated into one query, with each
//! identifier prefixed by its genome and [`GENOME_DELIMITER`], so the
//! aligner loads the reference database once per batch. The combined
//! output is then split back into one hit table per genome.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::config::SearchParams;
use crate::constants::{GENOME_DELIMITER, HIT_TABLE_COLUMNS};
use crate::sequence::io::create_buffered;
use crate::sequence::{read_protein_set, write_renamed_proteins};
use crate::tools::diamond::OUTPUT_COLUMNS;
use crate::tools::{HomologySearcher, SearchRequest};
use crate::types::BinCheckError;

/// Best reference match of one protein.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Reference sequence identifier.
    pub target: String,
    /// Percent identity.
    pub identity: f64,
    pub evalue: f64,
    pub bitscore: f64,
}

impl Hit {
    /// Whether `self` should replace `other` as the retained hit.
    ///
    /// Higher bitscore wins, then lower e-value, then the smaller target
    /// identifier so that equal-scoring hits resolve identically in every run.
    fn beats(&self, other: &Self) -> bool {
        self.bitscore
            .total_cmp(&other.bitscore)
            .then_with(|| other.evalue.total_cmp(&self.evalue))
            .then_with(|| other.target.cmp(&self.target))
            .is_gt()
    }
}

/// Protein identifier → best hit, for one genome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitTable {
    hits: BTreeMap<String, Hit>,
}

impl HitTable {
    /// Adds a hit, keeping only the best one per protein.
    pub fn insert(&mut self, protein: String, hit: Hit) {
        match self.hits.get_mut(&protein) {
            Some(current) if hit.beats(current) => *current = hit,
            Some(_) => {}
            None => {
                self.hits.insert(protein, hit);
            }
        }
    }

    #[must_use]
    pub fn get(&self, protein: &str) -> Option<&Hit> {
        self.hits.get(protein)
    }

    /// Hits ordered by protein identifier.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Hit)> {
        self.hits.iter().map(|(protein, hit)| (protein.as_str(), hit))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Parses a BLAST-tabular hit table; `#` lines are comments.
    ///
    /// # Errors
    ///
    /// Returns [`BinCheckError::MalformedArtifact`] for rows with the wrong
    /// number of columns or unparseable scores.
    pub fn read(path: &Path) -> Result<Self, BinCheckError> {
        let reader = BufReader::new(File::open(path)?);
        let mut table = Self::default();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (protein, hit) = parse_row(&line)
                .map_err(|message| BinCheckError::malformed(path, format!("line {}: {message}", index + 1)))?;
            table.insert(protein.to_string(), hit);
        }
        Ok(table)
    }
}

fn parse_row(line: &str) -> Result<(&str, Hit), String> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != HIT_TABLE_COLUMNS {
        return Err(format!(
            "expected {HIT_TABLE_COLUMNS} columns, found {}",
            fields.len()
        ));
    }
    let number = |index: usize| {
        fields[index]
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("column {}: {e}", OUTPUT_COLUMNS[index]))
    };
    Ok((
        fields[0],
        Hit {
            target: fields[1].to_string(),
            identity: number(2)?,
            evalue: number(10)?,
            bitscore: number(11)?,
        },
    ))
}

/// Header line written at the top of every per-genome hit table.
#[must_use]
pub fn hit_table_header() -> String {
    format!("#{}", OUTPUT_COLUMNS.join("\t"))
}

/// One genome taking part in a batched search.
#[derive(Debug, Clone)]
pub struct BatchMember {
    pub genome_id: String,
    /// Predicted proteins of the genome.
    pub proteins: PathBuf,
    /// Destination of the genome's hit table.
    pub hits: PathBuf,
}

/// Shared settings for all batches of a run.
#[derive(Debug, Clone, Copy)]
pub struct SearchSettings<'a> {
    pub database: &'a Path,
    pub threads: usize,
    pub params: SearchParams,
    /// Directory for the combined query and output files.
    pub scratch: &'a Path,
}

/// Searches a batch of genomes and writes one hit table per member.
///
/// Returns one result per member, in member order. When the combined
/// search fails, members are searched one by one so a single bad genome
/// cannot take its batch down with it.
pub fn search_batch(
    searcher: &dyn HomologySearcher,
    members: &[BatchMember],
    settings: &SearchSettings<'_>,
) -> Vec<Result<(), BinCheckError>> {
    let mut results: Vec<Result<(), BinCheckError>> = Vec::with_capacity(members.len());
    let mut runnable = Vec::new();
    let mut query = match tempfile::Builder::new()
        .prefix("batch-")
        .suffix(".faa")
        .tempfile_in(settings.scratch)
    {
        Ok(file) => file,
        Err(e) => {
            let message = e.to_string();
            return members
                .iter()
                .map(|_| Err(BinCheckError::IoError(std::io::Error::other(message.clone()))))
                .collect();
        }
    };

    for (index, member) in members.iter().enumerate() {
        let appended = read_protein_set(&member.proteins).and_then(|proteins| {
            write_renamed_proteins(query.as_file_mut(), &proteins, |id| {
                format!("{}{GENOME_DELIMITER}{id}", member.genome_id)
            })
        });
        match appended {
            Ok(()) => {
                runnable.push(index);
                results.push(Ok(()));
            }
            Err(e) => results.push(Err(e)),
        }
    }
    if runnable.is_empty() {
        return results;
    }

    let batch: Vec<&BatchMember> = runnable.iter().map(|&i| &members[i]).collect();
    if let Err(e) = run_and_split(searcher, query.path(), &batch, settings) {
        if batch.len() == 1 {
            results[runnable[0]] = Err(e);
        } else {
            log::warn!(
                "Batched search of {} genomes failed ({e}); retrying genomes individually",
                batch.len()
            );
            for &index in &runnable {
                let single = std::slice::from_ref(&members[index]);
                results[index] = search_batch(searcher, single, settings)
                    .pop()
                    .unwrap_or(Ok(()));
            }
        }
    }
    results
}

fn run_and_split(
    searcher: &dyn HomologySearcher,
    query: &Path,
    batch: &[&BatchMember],
    settings: &SearchSettings<'_>,
) -> Result<(), BinCheckError> {
    let output = tempfile::Builder::new()
        .prefix("batch-")
        .suffix(".tsv")
        .tempfile_in(settings.scratch)?
        .into_temp_path();
    let request = SearchRequest {
        query,
        database: settings.database,
        output: &output,
        threads: settings.threads,
        params: settings.params,
    };
    let produced = searcher.search(&request)?.into_result(searcher.name())?;
    if !produced.exists() {
        return Err(BinCheckError::tool(searcher.name(), "no hit table written"));
    }
    split_hits(&produced, batch)
}

/// Distributes combined search output to per-genome hit tables.
fn split_hits(combined: &Path, batch: &[&BatchMember]) -> Result<(), BinCheckError> {
    let header = hit_table_header();
    let mut writers = HashMap::with_capacity(batch.len());
    for member in batch {
        let mut writer = create_buffered(&member.hits)?;
        writeln!(writer, "{header}")?;
        writers.insert(member.genome_id.as_str(), writer);
    }

    let reader = BufReader::new(File::open(combined)?);
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let Some((genome, rest)) = line.split_once(GENOME_DELIMITER) else {
            return Err(BinCheckError::malformed(
                combined,
                format!("query without genome prefix: {line}"),
            ));
        };
        let writer = writers.get_mut(genome).ok_or_else(|| {
            BinCheckError::malformed(combined, format!("hit for unknown genome {genome}"))
        })?;
        writeln!(writer, "{rest}")?;
    }

    for (_, mut writer) in writers {
        writer.flush()?;
    }
    Ok(())
}

/// Removes a partially written hit table after a failed search.
pub fn discard_hits(member: &BatchMember) {
    if member.hits.exists() && fs::remove_file(&member.hits).is_err() {
        log::debug!("Could not remove {}", member.hits.display());
    }
}
