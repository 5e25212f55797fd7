//! Reference database bookkeeping and validation.
//!
//! The database path is resolved once per run, from the first of:
//!
//! 1. an explicit path (`--database_path`)
//! 2. the `BINCHECK_DB` environment variable
//! 3. the location stored in the JSON registry
//!
//! and validated before any genome is processed.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::BinCheckError;

/// Environment variable overriding the registered database location.
pub const DATABASE_ENV: &str = "BINCHECK_DB";

/// Extension of the optional checksum sidecar next to the database.
pub const CHECKSUM_EXTENSION: &str = "sha256";

/// Where the reference database lives.
pub trait DatabaseRegistry {
    /// Registered location, `None` when nothing is registered yet.
    fn location(&self) -> Result<Option<PathBuf>, BinCheckError>;

    fn set_location(&self, path: &Path) -> Result<(), BinCheckError>;
}

/// Decides whether a database file is usable.
pub trait DatabaseValidator {
    fn validate(&self, path: &Path) -> bool;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    database: Option<PathBuf>,
}

/// Registry stored as a small JSON document.
#[derive(Debug, Clone)]
pub struct JsonRegistry {
    path: PathBuf,
}

impl JsonRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatabaseRegistry for JsonRegistry {
    fn location(&self) -> Result<Option<PathBuf>, BinCheckError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.path)?;
        let file: RegistryFile = serde_json::from_str(&text).map_err(|e| {
            BinCheckError::Database(format!("registry {} is corrupt: {e}", self.path.display()))
        })?;
        Ok(file.database)
    }

    fn set_location(&self, path: &Path) -> Result<(), BinCheckError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = RegistryFile {
            database: Some(path.to_path_buf()),
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        log::info!("Database location set to {}", path.display());
        Ok(())
    }
}

/// Accepts non-empty files whose SHA-256 matches the `<db>.sha256`
/// sidecar when one exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumValidator;

impl ChecksumValidator {
    fn sidecar(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".");
        name.push(CHECKSUM_EXTENSION);
        PathBuf::from(name)
    }

    /// Hex-encoded SHA-256 of a file.
    pub fn digest(path: &Path) -> Result<String, BinCheckError> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 64 * 1024];
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}

impl DatabaseValidator for ChecksumValidator {
    fn validate(&self, path: &Path) -> bool {
        let non_empty = std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0);
        if !non_empty {
            return false;
        }
        let sidecar = Self::sidecar(path);
        if !sidecar.exists() {
            return true;
        }
        let expected = match std::fs::read_to_string(&sidecar) {
            Ok(text) => text.split_whitespace().next().unwrap_or_default().to_ascii_lowercase(),
            Err(_) => return false,
        };
        match Self::digest(path) {
            Ok(actual) => actual == expected,
            Err(e) => {
                log::debug!("Could not hash {}: {e}", path.display());
                false
            }
        }
    }
}

/// Resolves and validates the reference database path.
///
/// # Errors
///
/// Returns [`BinCheckError::Database`] when no location is known or the
/// resolved file fails validation. Both are fatal.
pub fn resolve_database(
    explicit: Option<&Path>,
    from_env: Option<PathBuf>,
    registry: &dyn DatabaseRegistry,
    validator: &dyn DatabaseValidator,
) -> Result<PathBuf, BinCheckError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match from_env.filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => path,
            None => registry.location()?.ok_or_else(|| {
                BinCheckError::Database(format!(
                    "no database location configured; pass --database_path, set {DATABASE_ENV} or run `bincheck database --setdblocation`"
                ))
            })?,
        },
    };

    if !validator.validate(&path) {
        return Err(BinCheckError::Database(format!(
            "{} is missing, empty or fails its checksum",
            path.display()
        )));
    }
    log::debug!("Using reference database {}", path.display());
    Ok(path)
}
