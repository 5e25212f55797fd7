use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::state::GenomeUnit;
use crate::constants::GENOME_DELIMITER;
use crate::types::BinCheckError;

/// Genome identifier of an input file: its name without the last extension.
#[must_use]
pub fn genome_id(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}

/// Turns input files into genome units.
///
/// Zero-byte files are skipped with a warning and never reach the report.
///
/// # Errors
///
/// Returns [`BinCheckError::InvalidConfig`] for a missing file, two inputs
/// with the same identifier, an identifier containing [`GENOME_DELIMITER`],
/// or when no usable input remains.
pub fn discover_units(inputs: &[PathBuf]) -> Result<Vec<GenomeUnit>, BinCheckError> {
    let mut units: BTreeMap<String, GenomeUnit> = BTreeMap::new();
    for input in inputs {
        let metadata = std::fs::metadata(input).map_err(|e| {
            BinCheckError::InvalidConfig(format!("cannot read input {}: {e}", input.display()))
        })?;
        if metadata.len() == 0 {
            log::warn!("Skipping {}: file is empty", input.display());
            continue;
        }
        let id = genome_id(input).ok_or_else(|| {
            BinCheckError::InvalidConfig(format!("cannot derive a genome name from {}", input.display()))
        })?;
        if id.contains(GENOME_DELIMITER) {
            return Err(BinCheckError::InvalidConfig(format!(
                "genome name {id} of {} contains the reserved character {GENOME_DELIMITER}",
                input.display()
            )));
        }
        if let Some(existing) = units.get(&id) {
            return Err(BinCheckError::InvalidConfig(format!(
                "inputs {} and {} share the genome name {id}",
                existing.input.display(),
                input.display()
            )));
        }
        units.insert(id.clone(), GenomeUnit::new(id, input.clone()));
    }

    if units.is_empty() {
        return Err(BinCheckError::InvalidConfig(
            "no non-empty input genomes".to_string(),
        ));
    }
    Ok(units.into_values().collect())
}
