//! Input normalisation.
//!
//! Accepts either a single directory (filtered by extension) or a list of
//! files. Gzipped genomes are decompressed into a scratch directory under a
//! canonical extension; tar archives are skipped.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use flate2::read::MultiGzDecoder;

const GZIP_EXTENSION: &str = "gz";

/// Canonical extension for decompressed inputs.
#[must_use]
pub fn canonical_extension(genes: bool) -> &'static str {
    if genes { "faa" } else { "fna" }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

fn is_gzipped(path: &Path) -> bool {
    has_extension(path, GZIP_EXTENSION)
}

/// Whether the decompressed stream opens with a valid tar header.
///
/// Covers ustar, GNU and pre-POSIX archives; the header checksum rejects
/// FASTA text.
fn is_tar_archive(path: &Path) -> io::Result<bool> {
    let decoder = MultiGzDecoder::new(BufReader::new(File::open(path)?));
    let mut archive = tar::Archive::new(decoder);
    let first = archive.entries()?.next();
    Ok(matches!(first, Some(Ok(_))))
}

/// `bin.1.fna.gz` → `bin.1`; `bin.gz` → `bin`.
fn decompressed_stem(path: &Path) -> Option<String> {
    let inner = Path::new(path.file_stem()?);
    let stem = if inner.extension().is_some() {
        inner.file_stem()?
    } else {
        inner.as_os_str()
    };
    Some(stem.to_string_lossy().into_owned())
}

fn decompress(path: &Path, target: &Path) -> anyhow::Result<()> {
    let mut decoder = MultiGzDecoder::new(BufReader::new(File::open(path)?));
    let mut writer = BufWriter::new(File::create(target)?);
    io::copy(&mut decoder, &mut writer)
        .with_context(|| format!("failed to decompress {}", path.display()))?;
    Ok(())
}

/// Files of `dir` ending in `.<extension>` or `.<extension>.gz`, sorted.
fn directory_members(dir: &Path, extension: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut members = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("cannot list input directory {}", dir.display()))?
    {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let plain = has_extension(&path, extension);
        let compressed = is_gzipped(&path)
            && path
                .file_stem()
                .is_some_and(|stem| has_extension(Path::new(stem), extension));
        if plain || compressed {
            members.push(path);
        }
    }
    members.sort();
    if members.is_empty() {
        bail!(
            "no files with extension .{extension} found in {}",
            dir.display()
        );
    }
    Ok(members)
}

/// Resolves command-line inputs to the genome files handed to the pipeline.
///
/// Decompressed copies are written to `scratch`, which must outlive the run.
///
/// # Errors
///
/// Fails when an input is missing, a directory holds no matching files, or a
/// gzip stream is corrupt.
pub fn collect_inputs(
    inputs: &[PathBuf],
    extension: &str,
    canonical: &str,
    scratch: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    let extension = extension.trim_start_matches('.');
    let candidates = match inputs {
        [dir] if dir.is_dir() => directory_members(dir, extension)?,
        _ => inputs
            .iter()
            .filter(|path| {
                if path.is_dir() {
                    log::warn!("Skipping directory {} in input list", path.display());
                    return false;
                }
                true
            })
            .cloned()
            .collect(),
    };

    let mut genomes = Vec::with_capacity(candidates.len());
    for path in candidates {
        let size = std::fs::metadata(&path)
            .with_context(|| format!("cannot read input {}", path.display()))?
            .len();
        if size == 0 || !is_gzipped(&path) {
            genomes.push(path);
            continue;
        }
        if is_tar_archive(&path).unwrap_or(false) {
            log::warn!("Skipping {}: tar archives are not supported", path.display());
            continue;
        }
        let Some(stem) = decompressed_stem(&path) else {
            bail!("cannot derive a genome name from {}", path.display());
        };
        let target = scratch.join(format!("{stem}.{canonical}"));
        log::debug!("Decompressing {} to {}", path.display(), target.display());
        decompress(&path, &target)?;
        genomes.push(target);
    }
    Ok(genomes)
}
