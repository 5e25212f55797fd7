//! Durable per-genome artifacts and resume probing.
//!
//! | Stage reached  | Artifact                                               |
//! |----------------|--------------------------------------------------------|
//! | `GenesCalled`  | `protein_files/<id>.faa` + `protein_files/<id>.json`   |
//! | `Searched`     | `diamond_output/<id>.tsv`                              |
//!
//! An artifact counts only when it is non-empty and parses; anything else
//! is treated as absent and the stage is recomputed.

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    GENE_CALL_RECORD_EXTENSION, HIT_TABLE_EXTENSION, PROTEIN_DIR, PROTEIN_EXTENSION, REPORT_FILE,
    SEARCH_DIR,
};
use crate::genes::GeneCallRecord;
use crate::homology::HitTable;
use crate::sequence::read_protein_set;
use crate::types::{BinCheckError, TranslationTable};

/// Paths inside one run's output directory.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    /// Creates the output directory and the intermediate subdirectories.
    ///
    /// # Errors
    ///
    /// Returns [`BinCheckError::InvalidConfig`] when the directories cannot
    /// be created.
    pub fn create(root: &Path) -> Result<Self, BinCheckError> {
        let layout = Self {
            root: root.to_path_buf(),
        };
        for dir in [layout.proteins_dir(), layout.search_dir()] {
            fs::create_dir_all(&dir).map_err(|e| {
                BinCheckError::InvalidConfig(format!(
                    "cannot create output directory {}: {e}",
                    dir.display()
                ))
            })?;
        }
        Ok(layout)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn proteins_dir(&self) -> PathBuf {
        self.root.join(PROTEIN_DIR)
    }

    #[must_use]
    pub fn search_dir(&self) -> PathBuf {
        self.root.join(SEARCH_DIR)
    }

    #[must_use]
    pub fn report(&self) -> PathBuf {
        self.root.join(REPORT_FILE)
    }

    #[must_use]
    pub fn proteins(&self, id: &str) -> PathBuf {
        self.proteins_dir().join(format!("{id}.{PROTEIN_EXTENSION}"))
    }

    #[must_use]
    pub fn gene_record(&self, id: &str) -> PathBuf {
        self.proteins_dir().join(format!("{id}.{GENE_CALL_RECORD_EXTENSION}"))
    }

    #[must_use]
    pub fn hits(&self, id: &str) -> PathBuf {
        self.search_dir().join(format!("{id}.{HIT_TABLE_EXTENSION}"))
    }

    /// Translation table of a reusable gene-calling result, if any.
    #[must_use]
    pub fn probe_genes(&self, id: &str) -> Option<TranslationTable> {
        let proteins = self.proteins(id);
        if !is_non_empty(&proteins) {
            return None;
        }
        let usable = read_protein_set(&proteins).is_ok_and(|set| !set.is_empty());
        let record = GeneCallRecord::read(&self.gene_record(id));
        match (usable, record) {
            (true, Ok(record)) => TranslationTable::new(record.translation_table).ok(),
            _ => {
                log::debug!("{id}: predicted proteins unusable, calling genes again");
                None
            }
        }
    }

    /// Whether a reusable hit table exists.
    #[must_use]
    pub fn probe_hits(&self, id: &str) -> bool {
        let hits = self.hits(id);
        if !is_non_empty(&hits) {
            return false;
        }
        let usable = HitTable::read(&hits).is_ok();
        if !usable {
            log::debug!("{id}: hit table unusable, searching again");
        }
        usable
    }

    /// Removes a hit table left over from earlier proteins of `id`.
    pub fn invalidate_hits(&self, id: &str) -> Result<(), BinCheckError> {
        let hits = self.hits(id);
        if hits.exists() {
            fs::remove_file(&hits)?;
        }
        Ok(())
    }

    /// Deletes protein and hit-table intermediates.
    pub fn remove_intermediates(&self) -> Result<(), BinCheckError> {
        for dir in [self.proteins_dir(), self.search_dir()] {
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
        }
        Ok(())
    }
}

fn is_non_empty(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}
