//! Supported digest algorithms

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Algorithms written for every artifact unless configured otherwise.
pub const DEFAULT_ALGORITHMS: &[DigestAlgorithm] = &[DigestAlgorithm::Sha1, DigestAlgorithm::Md5];

/// Errors from digest algorithm handling
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestError {
    #[error("unsupported digest algorithm: {name}")]
    UnsupportedAlgorithm { name: String },
}

/// A digest algorithm with a well-known Maven sidecar extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DigestAlgorithm {
    Sha1,
    Md5,
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// Every algorithm this crate knows about.
    pub const ALL: [DigestAlgorithm; 4] = [
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Md5,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha512,
    ];

    /// Canonical identifier, e.g. `SHA-1`
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Md5 => "MD5",
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Sidecar file extension, e.g. `sha1`
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Length of the hex digest in characters
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }

    /// Look up the algorithm owning a sidecar extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.extension() == ext)
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "sha1" => Ok(Self::Sha1),
            "md5" => Ok(Self::Md5),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            _ => Err(DigestError::UnsupportedAlgorithm {
                name: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for DigestAlgorithm {
    type Error = DigestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DigestAlgorithm> for String {
    fn from(value: DigestAlgorithm) -> Self {
        value.name().to_string()
    }
}

/// Parse a list of algorithm names, keeping the first occurrence of each.
///
/// Fails on the first name that is not supported.
pub fn parse_algorithms<S: AsRef<str>>(names: &[S]) -> Result<Vec<DigestAlgorithm>, DigestError> {
    let mut algorithms = Vec::with_capacity(names.len());
    for name in names {
        let algorithm: DigestAlgorithm = name.as_ref().parse()?;
        if !algorithms.contains(&algorithm) {
            algorithms.push(algorithm);
        }
    }
    Ok(algorithms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spellings() {
        assert_eq!("SHA-1".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha1);
        assert_eq!("sha1".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha1);
        assert_eq!("MD5".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Md5);
        assert_eq!("sha-256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert!("SHA-3".parse::<DigestAlgorithm>().is_err());
        assert!("".parse::<DigestAlgorithm>().is_err());
    }

    #[test]
    fn test_extensions() {
        assert_eq!(DigestAlgorithm::Sha1.extension(), "sha1");
        assert_eq!(DigestAlgorithm::Md5.extension(), "md5");
        assert_eq!(DigestAlgorithm::from_extension("md5"), Some(DigestAlgorithm::Md5));
        assert_eq!(DigestAlgorithm::from_extension("asc"), None);
    }

    #[test]
    fn test_parse_algorithms_dedup_and_order() {
        let parsed = parse_algorithms(&["MD5", "SHA-1", "md5"]).unwrap();
        assert_eq!(parsed, vec![DigestAlgorithm::Md5, DigestAlgorithm::Sha1]);
    }

    #[test]
    fn test_parse_algorithms_rejects_unknown() {
        let err = parse_algorithms(&["SHA-1", "whirlpool"]).unwrap_err();
        assert_eq!(
            err,
            DigestError::UnsupportedAlgorithm {
                name: "whirlpool".to_string()
            }
        );
    }

    #[test]
    fn test_display_is_canonical_name() {
        assert_eq!(DigestAlgorithm::Sha512.to_string(), "SHA-512");
    }
}
