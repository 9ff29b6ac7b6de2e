//! Checksum sidecars
//!
//! One `ChecksumRecord` per (file, algorithm). The digest is written next
//! to the file as `<file>.<ext>` containing only the lowercase hex string.
//! Checksums are always recomputed from the current content.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use maven_digest::{compute_digest, sidecar_path, DigestAlgorithm};

/// A computed checksum for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumRecord {
    /// File the digest was computed over
    pub path: PathBuf,
    /// Algorithm used
    pub algorithm: DigestAlgorithm,
    /// Lowercase hex digest
    pub digest: String,
}

impl ChecksumRecord {
    /// Compute a record from already-read content
    pub fn compute(path: &Path, bytes: &[u8], algorithm: DigestAlgorithm) -> Self {
        Self {
            path: path.to_path_buf(),
            algorithm,
            digest: compute_digest(bytes, algorithm),
        }
    }

    /// Location of the sidecar file
    pub fn sidecar_path(&self) -> PathBuf {
        sidecar_path(&self.path, self.algorithm)
    }

    /// Write the sidecar, replacing any previous one
    pub fn write_sidecar(&self) -> io::Result<PathBuf> {
        let sidecar = self.sidecar_path();
        fs::write(&sidecar, self.digest.as_bytes())?;
        Ok(sidecar)
    }
}

/// Compute and write a sidecar for every algorithm.
///
/// The file is read once; all digests are taken over the same bytes.
pub fn write_checksums(path: &Path, algorithms: &[DigestAlgorithm]) -> io::Result<Vec<ChecksumRecord>> {
    let bytes = fs::read(path)?;
    let mut records = Vec::with_capacity(algorithms.len());
    for algorithm in algorithms {
        let record = ChecksumRecord::compute(path, &bytes, *algorithm);
        record.write_sidecar()?;
        records.push(record);
    }
    Ok(records)
}
