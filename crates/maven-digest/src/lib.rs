//! Maven Digest
//!
//! Content digests for release artifacts and the naming of the checksum
//! sidecars (`<file>.sha1`, `<file>.md5`, ...) that accompany them in a
//! Maven repository layout.

pub mod algorithm;

pub use algorithm::{parse_algorithms, DigestAlgorithm, DigestError, DEFAULT_ALGORITHMS};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

/// Compute the lowercase hex digest of `bytes` under `algorithm`.
///
/// Every call hashes the bytes it is given; nothing is cached.
pub fn compute_digest(bytes: &[u8], algorithm: DigestAlgorithm) -> String {
    match algorithm {
        DigestAlgorithm::Sha1 => hex_digest::<Sha1>(bytes),
        DigestAlgorithm::Md5 => hex_digest::<Md5>(bytes),
        DigestAlgorithm::Sha256 => hex_digest::<Sha256>(bytes),
        DigestAlgorithm::Sha512 => hex_digest::<Sha512>(bytes),
    }
}

/// Compute a digest for an algorithm given by name (e.g. `"SHA-1"`).
pub fn compute_digest_named(bytes: &[u8], algorithm: &str) -> Result<String, DigestError> {
    let algorithm: DigestAlgorithm = algorithm.parse()?;
    Ok(compute_digest(bytes, algorithm))
}

/// Read the current content of `path` and digest it.
pub fn digest_file(path: &Path, algorithm: DigestAlgorithm) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(compute_digest(&bytes, algorithm))
}

/// Path of the checksum sidecar for `path`: `<path>.<ext>`.
pub fn sidecar_path(path: &Path, algorithm: DigestAlgorithm) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(algorithm.extension());
    PathBuf::from(name)
}

fn hex_digest<D: Digest>(bytes: &[u8]) -> String {
    hex::encode(D::digest(bytes))
}
