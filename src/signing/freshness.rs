//! Signature freshness
//!
//! Decides whether an existing `<file>.asc` still covers the file. The
//! default policy compares modification times; the content-hash policy
//! keeps a ledger of the SHA-256 each file had when it was signed, which
//! survives tools that rewrite or preserve timestamps.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::SigningError;
use crate::staging::SIGNATURE_EXTENSION;

/// Schema version for the signature ledger
pub const LEDGER_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for the signature ledger
pub const LEDGER_SCHEMA_ID: &str = "maven-bundle/signature_ledger@1";

/// How staleness of a signature sidecar is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FreshnessPolicy {
    /// Stale when the sidecar is missing or older than the file
    #[default]
    Mtime,
    /// Stale when the sidecar is missing or the content hash changed
    ContentHash,
}

/// Path of the detached signature sidecar for `path`
pub fn signature_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(SIGNATURE_EXTENSION);
    PathBuf::from(name)
}

/// Modification-time freshness test.
///
/// True iff the sidecar does not exist or was modified strictly before
/// the file itself.
pub fn is_stale_by_mtime(path: &Path, sidecar: &Path) -> io::Result<bool> {
    let sidecar_meta = match fs::metadata(sidecar) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e),
    };

    let source_modified = fs::metadata(path)?.modified()?;
    let sidecar_modified = sidecar_meta.modified()?;
    Ok(sidecar_modified < source_modified)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    schema_version: u32,
    schema_id: String,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// Record of the content hash each file had when it was last signed
#[derive(Debug, Clone)]
pub struct SignatureLedger {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl SignatureLedger {
    /// Load the ledger at `path`; a missing file yields an empty ledger
    pub fn load(path: &Path) -> Result<Self, SigningError> {
        let entries = match fs::read_to_string(path) {
            Ok(json) => {
                let file: LedgerFile =
                    serde_json::from_str(&json).map_err(|source| SigningError::Ledger {
                        path: path.to_path_buf(),
                        source,
                    })?;
                file.entries
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(SigningError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Persist the ledger, creating parent directories as needed
    pub fn save(&self) -> Result<(), SigningError> {
        let io_err = |source: io::Error| SigningError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let file = LedgerFile {
            schema_version: LEDGER_SCHEMA_VERSION,
            schema_id: LEDGER_SCHEMA_ID.to_string(),
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|source| SigningError::Ledger {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(io_err)
    }

    /// Content-hash freshness test
    pub fn is_stale(&self, path: &Path, sidecar: &Path) -> io::Result<bool> {
        if !sidecar.exists() {
            return Ok(true);
        }
        match self.entries.get(&ledger_key(path)) {
            Some(recorded) => Ok(*recorded != content_sha256(path)?),
            None => Ok(true),
        }
    }

    /// Remember the current content hash of `path`
    pub fn record(&mut self, path: &Path) -> io::Result<()> {
        let digest = content_sha256(path)?;
        self.entries.insert(ledger_key(path), digest);
        Ok(())
    }

    /// Number of recorded files
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn ledger_key(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}

fn content_sha256(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
