//! Release error taxonomy and stable exit codes

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;

use crate::archive::{ArchiveError, RenameError};
use crate::collect::CollectError;
use crate::config::ConfigError;
use crate::signing::SigningError;
use crate::staging::{IgnoreError, StagingError};
use maven_digest::DigestError;

/// Stable process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExitCode {
    /// Archive written
    Success = 0,
    /// Configuration could not be loaded or is invalid
    Config = 10,
    /// Unknown digest algorithm requested
    UnsupportedAlgorithm = 11,
    /// A required staging file is absent
    StagingFileMissing = 20,
    /// Filesystem error outside archive writing
    Io = 21,
    /// Signing tool failed, timed out or could not be launched
    SigningToolFailure = 30,
    /// Output archive could not be written
    ArchiveWriteFailure = 40,
}

impl ExitCode {
    /// Get the integer value of the exit code
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Create from integer value
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(ExitCode::Success),
            10 => Some(ExitCode::Config),
            11 => Some(ExitCode::UnsupportedAlgorithm),
            20 => Some(ExitCode::StagingFileMissing),
            21 => Some(ExitCode::Io),
            30 => Some(ExitCode::SigningToolFailure),
            40 => Some(ExitCode::ArchiveWriteFailure),
            _ => None,
        }
    }

    /// Check if this exit code indicates success
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

/// Any failure of a release run. None are retried.
#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    #[error("unsupported checksum algorithm: {name}")]
    UnsupportedAlgorithm { name: String },

    #[error("staging file missing: {0}")]
    StagingFileMissing(#[source] StagingError),

    #[error("signing tool failure: {0}")]
    SigningToolFailure(#[source] SigningError),

    #[error("archive write failure: {0}")]
    ArchiveWriteFailure(#[source] ArchiveError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ReleaseError {
    /// Exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ReleaseError::UnsupportedAlgorithm { .. } => ExitCode::UnsupportedAlgorithm,
            ReleaseError::StagingFileMissing(_) => ExitCode::StagingFileMissing,
            ReleaseError::SigningToolFailure(_) => ExitCode::SigningToolFailure,
            ReleaseError::ArchiveWriteFailure(_) => ExitCode::ArchiveWriteFailure,
            ReleaseError::Config(_) => ExitCode::Config,
            ReleaseError::Io { .. } => ExitCode::Io,
        }
    }

    /// Short machine-readable kind, as used in JSON error output
    pub fn kind(&self) -> &'static str {
        match self {
            ReleaseError::UnsupportedAlgorithm { .. } => "unsupported_algorithm",
            ReleaseError::StagingFileMissing(_) => "staging_file_missing",
            ReleaseError::SigningToolFailure(_) => "signing_tool_failure",
            ReleaseError::ArchiveWriteFailure(_) => "archive_write_failure",
            ReleaseError::Config(_) => "config",
            ReleaseError::Io { .. } => "io",
        }
    }
}

impl From<DigestError> for ReleaseError {
    fn from(err: DigestError) -> Self {
        match err {
            DigestError::UnsupportedAlgorithm { name } => ReleaseError::UnsupportedAlgorithm { name },
        }
    }
}

impl From<StagingError> for ReleaseError {
    fn from(err: StagingError) -> Self {
        match err {
            StagingError::RootMissing(_) | StagingError::Missing { .. } => {
                ReleaseError::StagingFileMissing(err)
            }
            StagingError::Io { path, source } => ReleaseError::Io { path, source },
            StagingError::Walk(walk) => ReleaseError::Io {
                path: walk.path().map(PathBuf::from).unwrap_or_default(),
                source: walk.into(),
            },
            StagingError::OutsideRoot(path) => ReleaseError::Io {
                source: io::Error::new(io::ErrorKind::InvalidInput, "path escapes staging root"),
                path,
            },
        }
    }
}

impl From<SigningError> for ReleaseError {
    fn from(err: SigningError) -> Self {
        ReleaseError::SigningToolFailure(err)
    }
}

impl From<CollectError> for ReleaseError {
    fn from(err: CollectError) -> Self {
        match err {
            CollectError::Staging(e) => e.into(),
            CollectError::Checksum { path, source } => ReleaseError::Io { path, source },
            CollectError::Signing(e) => e.into(),
        }
    }
}

impl From<ArchiveError> for ReleaseError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Staging(e) => e.into(),
            other => ReleaseError::ArchiveWriteFailure(other),
        }
    }
}

impl From<IgnoreError> for ReleaseError {
    fn from(err: IgnoreError) -> Self {
        ReleaseError::Config(ConfigError::ValidationError(format!("staging.ignore: {}", err)))
    }
}

impl From<RenameError> for ReleaseError {
    fn from(err: RenameError) -> Self {
        ReleaseError::Config(ConfigError::ValidationError(format!("archive.rename: {}", err)))
    }
}
