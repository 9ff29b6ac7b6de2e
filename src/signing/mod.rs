//! Detached signatures
//!
//! `SignatureManager` decides per file whether the `.asc` sidecar must be
//! regenerated and, if so, asks a `Signer` to produce it. The signer is a
//! trait so the external tool can be replaced in tests.

mod command;
mod freshness;

pub use command::{CommandSigner, DEFAULT_ARGS, DEFAULT_PROGRAM, DEFAULT_TIMEOUT_SECONDS};
pub use freshness::{
    is_stale_by_mtime, signature_path, FreshnessPolicy, SignatureLedger, LEDGER_SCHEMA_ID,
    LEDGER_SCHEMA_VERSION,
};

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// Errors from signing
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("failed to launch signing tool {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {} while signing {}{}",
        describe_exit(.exit_code), .path.display(), stderr_suffix(.stderr))]
    ToolFailed {
        path: PathBuf,
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("signing {} timed out after {seconds}s", .path.display())]
    Timeout { path: PathBuf, seconds: f64 },

    #[error("signing tool succeeded but wrote no signature at {}", .path.display())]
    MissingSignature { path: PathBuf },

    #[error("invalid signature ledger {}: {source}", .path.display())]
    Ledger {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

impl SigningError {
    /// Exit status of the signing tool, if it ran to completion
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            SigningError::ToolFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

/// Produces a detached signature sidecar for a file
pub trait Signer {
    /// Sign `path`, leaving `<path>.asc` on disk
    fn sign(&self, path: &Path) -> Result<(), SigningError>;
}

/// A signature read back after signing
#[derive(Debug, Clone)]
pub struct SignatureRecord {
    /// Signed file
    pub path: PathBuf,
    /// The `.asc` sidecar
    pub sidecar: PathBuf,
    /// Sidecar content as written by the tool
    pub signature: Vec<u8>,
}

/// What happened to a file's signature during a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureOutcome {
    /// A new signature was produced
    Signed,
    /// The existing signature was still fresh
    Fresh,
    /// Signing is turned off
    Disabled,
}

/// Freshness-gated signing of staged files
pub struct SignatureManager {
    signer: Box<dyn Signer>,
    policy: FreshnessPolicy,
    ledger: Option<SignatureLedger>,
}

impl SignatureManager {
    /// Manager using modification-time freshness
    pub fn new(signer: Box<dyn Signer>) -> Self {
        Self {
            signer,
            policy: FreshnessPolicy::Mtime,
            ledger: None,
        }
    }

    /// Switch to content-hash freshness backed by `ledger`
    pub fn with_ledger(mut self, ledger: SignatureLedger) -> Self {
        self.policy = FreshnessPolicy::ContentHash;
        self.ledger = Some(ledger);
        self
    }

    /// Active freshness policy
    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    /// Whether `path` needs a new signature
    pub fn should_sign(&self, path: &Path) -> Result<bool, SigningError> {
        let sidecar = signature_path(path);
        let stale = match &self.ledger {
            Some(ledger) => ledger.is_stale(path, &sidecar),
            None => is_stale_by_mtime(path, &sidecar),
        };
        stale.map_err(|source| SigningError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Sign `path` unconditionally and read back the sidecar
    pub fn sign(&mut self, path: &Path) -> Result<SignatureRecord, SigningError> {
        self.signer.sign(path)?;

        let sidecar = signature_path(path);
        let signature = fs::read(&sidecar).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => SigningError::MissingSignature {
                path: sidecar.clone(),
            },
            _ => SigningError::Io {
                path: sidecar.clone(),
                source,
            },
        })?;

        if let Some(ledger) = self.ledger.as_mut() {
            ledger.record(path).map_err(|source| SigningError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            ledger.save()?;
        }

        info!(path = %path.display(), "signed");
        Ok(SignatureRecord {
            path: path.to_path_buf(),
            sidecar,
            signature,
        })
    }

    /// Sign `path` only if its signature is stale
    pub fn ensure_signed(&mut self, path: &Path) -> Result<SignatureOutcome, SigningError> {
        if self.should_sign(path)? {
            self.sign(path)?;
            Ok(SignatureOutcome::Signed)
        } else {
            debug!(path = %path.display(), "signature is fresh, skipping");
            Ok(SignatureOutcome::Fresh)
        }
    }
}
