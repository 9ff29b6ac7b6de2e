//! Typed view of the merged configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::ConfigError;
use crate::archive::{ArchiveFormat, RenameRuleConfig};
use crate::coordinate::RepositoryCoordinate;
use crate::signing::FreshnessPolicy;
use crate::staging::ArtifactRole;

/// Upper bound for `signing.timeout_seconds`
pub const MAX_SIGNING_TIMEOUT_SECONDS: u64 = 3600;

/// `[project]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub group_id: String,
    /// Project name; the artifactId defaults to its lowercased form
    pub name: String,
    pub artifact_id: Option<String>,
    pub version: String,
}

impl ProjectConfig {
    /// Resolve the repository coordinate
    pub fn coordinate(&self) -> Result<RepositoryCoordinate, ConfigError> {
        let result = match &self.artifact_id {
            Some(artifact_id) => {
                RepositoryCoordinate::new(&self.group_id, artifact_id.as_str(), &self.version)
            }
            None => RepositoryCoordinate::from_project(&self.group_id, &self.name, &self.version),
        };
        result.map_err(|e| ConfigError::ValidationError(format!("project: {}", e)))
    }
}

/// `[staging]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingConfig {
    pub root: PathBuf,
    pub metadata_dir: String,
    pub required: Vec<ArtifactRole>,
    pub ignore: Vec<String>,
    /// File with extra ignore globs, one per line
    pub ignore_file: Option<PathBuf>,
}

/// `[checksums]`
///
/// Names stay strings here; they are parsed before any file is touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecksumConfig {
    pub algorithms: Vec<String>,
}

/// `[signing]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigningConfig {
    pub enabled: bool,
    pub program: String,
    pub args: Vec<String>,
    pub key_id: Option<String>,
    pub timeout_seconds: u64,
    pub freshness: FreshnessPolicy,
    /// Ledger file for the content-hash policy
    pub ledger: PathBuf,
}

/// `[archive]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    pub output_dir: PathBuf,
    pub file_name: Option<String>,
    pub format: ArchiveFormat,
    pub rename: Vec<RenameRuleConfig>,
}

impl ArchiveConfig {
    /// Output archive path for a project.
    ///
    /// `file_name` may use the `{groupId}`, `{artifactId}` and `{version}`
    /// placeholders; without it the name is `<name>-<version>-maven.<ext>`.
    pub fn output_path(&self, project: &ProjectConfig, coordinate: &RepositoryCoordinate) -> PathBuf {
        let file_name = match &self.file_name {
            Some(template) => coordinate.expand(template),
            None => self
                .format
                .default_file_name(&project.name, &coordinate.version),
        };
        self.output_dir.join(file_name)
    }
}

/// `[metadata]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataConfig {
    pub import_local: bool,
    pub local_repository: Option<PathBuf>,
}

/// Complete release configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseConfig {
    pub project: ProjectConfig,
    pub staging: StagingConfig,
    pub checksums: ChecksumConfig,
    pub signing: SigningConfig,
    pub archive: ArchiveConfig,
    pub metadata: MetadataConfig,
}

impl ReleaseConfig {
    /// Range and shape checks that do not need the coordinate
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeout = self.signing.timeout_seconds;
        if timeout == 0 || timeout > MAX_SIGNING_TIMEOUT_SECONDS {
            return Err(ConfigError::ValidationError(format!(
                "signing.timeout_seconds must be in (0, {}]",
                MAX_SIGNING_TIMEOUT_SECONDS
            )));
        }

        let metadata_dir = &self.staging.metadata_dir;
        if metadata_dir.is_empty() || metadata_dir.contains(['/', '\\']) {
            return Err(ConfigError::ValidationError(format!(
                "staging.metadata_dir must be a single directory name, got {:?}",
                metadata_dir
            )));
        }

        if self.checksums.algorithms.is_empty() {
            return Err(ConfigError::ValidationError(
                "checksums.algorithms must not be empty".to_string(),
            ));
        }

        if self.signing.enabled && self.signing.program.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "signing.program must be set when signing is enabled".to_string(),
            ));
        }

        if let Some(name) = &self.archive.file_name {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(ConfigError::ValidationError(format!(
                    "archive.file_name must be a plain file name, got {:?}",
                    name
                )));
            }
        }

        Ok(())
    }
}
