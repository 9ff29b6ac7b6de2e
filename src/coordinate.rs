//! Repository coordinates
//!
//! A coordinate (groupId, artifactId, version) fixes where an artifact
//! lives inside a Maven repository: `groupPath/artifactId/version`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors from coordinate validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} contains invalid character {ch:?}: {value}")]
    InvalidChar {
        field: &'static str,
        value: String,
        ch: char,
    },
}

/// The (groupId, artifactId, version) triple of a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl RepositoryCoordinate {
    /// Create a validated coordinate
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, CoordinateError> {
        let coordinate = Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        };
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Build a coordinate from a project name; the artifactId is the
    /// lowercased name.
    pub fn from_project(
        group_id: impl Into<String>,
        project_name: &str,
        version: impl Into<String>,
    ) -> Result<Self, CoordinateError> {
        Self::new(group_id, project_name.to_lowercase(), version)
    }

    fn validate(&self) -> Result<(), CoordinateError> {
        for (field, value) in [
            ("group_id", &self.group_id),
            ("artifact_id", &self.artifact_id),
            ("version", &self.version),
        ] {
            if value.trim().is_empty() {
                return Err(CoordinateError::Empty { field });
            }
            if let Some(ch) = value
                .chars()
                .find(|c| matches!(c, '/' | '\\') || c.is_whitespace())
            {
                return Err(CoordinateError::InvalidChar {
                    field,
                    value: value.clone(),
                    ch,
                });
            }
        }
        if self.group_id.split('.').any(str::is_empty) {
            return Err(CoordinateError::InvalidChar {
                field: "group_id",
                value: self.group_id.clone(),
                ch: '.',
            });
        }
        Ok(())
    }

    /// groupId with dots replaced by slashes (`dev.sbs` -> `dev/sbs`)
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }

    /// Directory shared by all versions: `groupPath/artifactId`
    pub fn artifact_dir(&self) -> String {
        format!("{}/{}", self.group_path(), self.artifact_id)
    }

    /// Versioned directory: `groupPath/artifactId/version`
    pub fn version_dir(&self) -> String {
        format!("{}/{}", self.artifact_dir(), self.version)
    }

    /// Base name of the canonical artifact files: `artifactId-version`
    pub fn artifact_name(&self) -> String {
        format!("{}-{}", self.artifact_id, self.version)
    }

    /// Expand `{groupId}`, `{artifactId}` and `{version}` placeholders.
    pub fn expand(&self, template: &str) -> String {
        template
            .replace("{groupId}", &self.group_id)
            .replace("{artifactId}", &self.artifact_id)
            .replace("{version}", &self.version)
    }
}

impl fmt::Display for RepositoryCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let coord = RepositoryCoordinate::new("dev.sbs", "mylib", "1.0.3").unwrap();
        assert_eq!(coord.group_path(), "dev/sbs");
        assert_eq!(coord.artifact_dir(), "dev/sbs/mylib");
        assert_eq!(coord.version_dir(), "dev/sbs/mylib/1.0.3");
        assert_eq!(coord.artifact_name(), "mylib-1.0.3");
        assert_eq!(coord.to_string(), "dev.sbs:mylib:1.0.3");
    }

    #[test]
    fn test_from_project_lowercases() {
        let coord =
            RepositoryCoordinate::from_project("dev.sbs", "SimplifiedAnnotations", "1.0.0").unwrap();
        assert_eq!(coord.artifact_id, "simplifiedannotations");
    }

    #[test]
    fn test_prerelease_version_kept() {
        let coord = RepositoryCoordinate::new("dev.sbs", "mylib", "2.0.0-SNAPSHOT").unwrap();
        assert_eq!(coord.version_dir(), "dev/sbs/mylib/2.0.0-SNAPSHOT");
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            RepositoryCoordinate::new("", "a", "1").unwrap_err(),
            CoordinateError::Empty { field: "group_id" }
        );
        assert!(matches!(
            RepositoryCoordinate::new("dev/sbs", "a", "1").unwrap_err(),
            CoordinateError::InvalidChar { ch: '/', .. }
        ));
        assert!(RepositoryCoordinate::new("dev..sbs", "a", "1").is_err());
        assert!(RepositoryCoordinate::new("dev.sbs", "a b", "1").is_err());
    }

    #[test]
    fn test_expand() {
        let coord = RepositoryCoordinate::new("dev.sbs", "mylib", "1.0.3").unwrap();
        assert_eq!(coord.expand("{artifactId}-{version}.pom"), "mylib-1.0.3.pom");
        assert_eq!(coord.expand("{groupId}"), "dev.sbs");
        assert_eq!(coord.expand("plain.txt"), "plain.txt");
    }
}
