//! Staging root traversal
//!
//! The staging root holds the build outputs of a release (primary jar,
//! sources and javadoc jars, generated POM, optional metadata) together
//! with the sidecars written by earlier passes. This module walks it
//! lazily, classifies each file and filters the sidecars out.

mod ignore;

pub use ignore::{IgnoreError, IgnoreRules};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

use crate::coordinate::RepositoryCoordinate;
use maven_digest::DigestAlgorithm;

/// Default name of the metadata subdirectory inside the staging root
pub const DEFAULT_METADATA_DIR: &str = "metadata";

/// Extension of detached signature sidecars
pub const SIGNATURE_EXTENSION: &str = "asc";

/// Name of the POM generated by the build
pub const GENERATED_POM_NAME: &str = "pom-default.xml";

/// Roles that must be staged unless configured otherwise
pub const DEFAULT_REQUIRED_ROLES: &[ArtifactRole] = &[
    ArtifactRole::Jar,
    ArtifactRole::Pom,
    ArtifactRole::SourcesJar,
    ArtifactRole::JavadocJar,
];

/// Errors from staging traversal
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("staging root does not exist: {}", .0.display())]
    RootMissing(PathBuf),

    #[error("missing {role} artifact in staging root (expected {})", .expected.display())]
    Missing {
        role: ArtifactRole,
        expected: PathBuf,
    },

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("path is not within staging root: {}", .0.display())]
    OutsideRoot(PathBuf),

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StagingError {
    /// Path the error refers to
    pub fn path(&self) -> Option<&Path> {
        match self {
            StagingError::RootMissing(path) | StagingError::OutsideRoot(path) => Some(path),
            StagingError::Missing { expected, .. } => Some(expected),
            StagingError::Io { path, .. } => Some(path),
            StagingError::Walk(err) => err.path(),
        }
    }
}

/// Logical role of a staged file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactRole {
    Jar,
    SourcesJar,
    JavadocJar,
    Pom,
    Metadata,
    Other,
}

impl ArtifactRole {
    /// Classify a path relative to the staging root
    pub fn classify(relative_path: &Path, metadata_dir: &str) -> Self {
        let in_metadata_dir = relative_path
            .components()
            .next()
            .map(|c| c.as_os_str() == metadata_dir)
            .unwrap_or(false);

        let name = relative_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if in_metadata_dir || (name.starts_with("maven-metadata") && name.ends_with(".xml")) {
            ArtifactRole::Metadata
        } else if name.ends_with("-sources.jar") {
            ArtifactRole::SourcesJar
        } else if name.ends_with("-javadoc.jar") {
            ArtifactRole::JavadocJar
        } else if name.ends_with(".jar") {
            ArtifactRole::Jar
        } else if name == GENERATED_POM_NAME || name.ends_with(".pom") {
            ArtifactRole::Pom
        } else {
            ArtifactRole::Other
        }
    }

    /// Conventional staged file name for this role
    pub fn expected_name(&self, coordinate: &RepositoryCoordinate, metadata_dir: &str) -> String {
        let base = coordinate.artifact_name();
        match self {
            ArtifactRole::Jar => format!("{}-base.jar", base),
            ArtifactRole::SourcesJar => format!("{}-sources.jar", base),
            ArtifactRole::JavadocJar => format!("{}-javadoc.jar", base),
            ArtifactRole::Pom => GENERATED_POM_NAME.to_string(),
            ArtifactRole::Metadata => format!("{}/maven-metadata.xml", metadata_dir),
            ArtifactRole::Other => "*".to_string(),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ArtifactRole::Jar => "jar",
            ArtifactRole::SourcesJar => "sources-jar",
            ArtifactRole::JavadocJar => "javadoc-jar",
            ArtifactRole::Pom => "pom",
            ArtifactRole::Metadata => "metadata",
            ArtifactRole::Other => "other",
        }
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check whether a path is a sidecar written by a previous pass.
///
/// Every known digest extension counts, not only the configured ones,
/// so checksums of checksums are never produced.
pub fn is_sidecar(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(SIGNATURE_EXTENSION) => true,
        Some(ext) => DigestAlgorithm::from_extension(ext).is_some(),
        None => false,
    }
}

/// A build output in the staging root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedFile {
    /// Full path on disk
    pub path: PathBuf,
    /// Path relative to the staging root
    pub relative_path: PathBuf,
    /// Logical role
    pub role: ArtifactRole,
}

impl StagedFile {
    /// Read the current file content
    pub fn read_bytes(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }

    /// Last modification time
    pub fn modified(&self) -> io::Result<SystemTime> {
        fs::metadata(&self.path)?.modified()
    }

    /// File name component
    pub fn file_name(&self) -> String {
        self.relative_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Lazy walk over the qualifying files of a staging root.
///
/// Directories, sidecars and ignored paths are skipped. Re-walking is
/// side-effect free.
pub struct StagingWalk {
    root: PathBuf,
    metadata_dir: String,
    ignore: IgnoreRules,
    inner: walkdir::IntoIter,
}

impl Iterator for StagingWalk {
    type Item = Result<StagedFile, StagingError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(StagingError::Walk(err))),
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let rel_path = match path.strip_prefix(&self.root) {
                Ok(rel) => rel,
                Err(_) => return Some(Err(StagingError::OutsideRoot(path.to_path_buf()))),
            };

            if is_sidecar(rel_path) || self.ignore.is_ignored(rel_path) {
                continue;
            }

            return Some(Ok(StagedFile {
                path: path.to_path_buf(),
                relative_path: rel_path.to_path_buf(),
                role: ArtifactRole::classify(rel_path, &self.metadata_dir),
            }));
        }
    }
}

/// Start a lazy walk over the staging root.
pub fn staged_files(
    root: &Path,
    metadata_dir: &str,
    ignore: &IgnoreRules,
) -> Result<StagingWalk, StagingError> {
    if !root.is_dir() {
        return Err(StagingError::RootMissing(root.to_path_buf()));
    }

    let inner = WalkDir::new(root)
        .follow_links(true)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter();

    Ok(StagingWalk {
        root: root.to_path_buf(),
        metadata_dir: metadata_dir.to_string(),
        ignore: ignore.clone(),
        inner,
    })
}

/// Check that every required role is present in the staging root.
pub fn verify_required(
    root: &Path,
    coordinate: &RepositoryCoordinate,
    required: &[ArtifactRole],
    metadata_dir: &str,
    ignore: &IgnoreRules,
) -> Result<(), StagingError> {
    let mut present = BTreeSet::new();
    for file in staged_files(root, metadata_dir, ignore)? {
        present.insert(file?.role);
    }

    for role in required {
        if *role == ArtifactRole::Other {
            continue;
        }
        if !present.contains(role) {
            return Err(StagingError::Missing {
                role: *role,
                expected: root.join(role.expected_name(coordinate, metadata_dir)),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stage(dir: &Path, names: &[&str]) {
        for name in names {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, name.as_bytes()).unwrap();
        }
    }

    fn coordinate() -> RepositoryCoordinate {
        RepositoryCoordinate::new("dev.sbs", "mylib", "1.0.3").unwrap()
    }

    #[test]
    fn test_classify_roles() {
        let md = DEFAULT_METADATA_DIR;
        assert_eq!(ArtifactRole::classify(Path::new("mylib-1.0.3-base.jar"), md), ArtifactRole::Jar);
        assert_eq!(ArtifactRole::classify(Path::new("mylib-1.0.3.jar"), md), ArtifactRole::Jar);
        assert_eq!(
            ArtifactRole::classify(Path::new("mylib-1.0.3-sources.jar"), md),
            ArtifactRole::SourcesJar
        );
        assert_eq!(
            ArtifactRole::classify(Path::new("mylib-1.0.3-javadoc.jar"), md),
            ArtifactRole::JavadocJar
        );
        assert_eq!(ArtifactRole::classify(Path::new("pom-default.xml"), md), ArtifactRole::Pom);
        assert_eq!(
            ArtifactRole::classify(Path::new("metadata/maven-metadata.xml"), md),
            ArtifactRole::Metadata
        );
        assert_eq!(ArtifactRole::classify(Path::new("README.txt"), md), ArtifactRole::Other);
    }

    #[test]
    fn test_is_sidecar() {
        assert!(is_sidecar(Path::new("a.jar.sha1")));
        assert!(is_sidecar(Path::new("a.jar.md5")));
        assert!(is_sidecar(Path::new("a.jar.asc")));
        assert!(is_sidecar(Path::new("a.jar.sha256")));
        assert!(!is_sidecar(Path::new("a.jar")));
        assert!(!is_sidecar(Path::new("pom-default.xml")));
        assert!(!is_sidecar(Path::new("LICENSE")));
    }

    #[test]
    fn test_walk_skips_sidecars_and_dirs() {
        let dir = TempDir::new().unwrap();
        stage(
            dir.path(),
            &[
                "mylib-1.0.3-base.jar",
                "mylib-1.0.3-base.jar.sha1",
                "mylib-1.0.3-base.jar.md5",
                "mylib-1.0.3-base.jar.asc",
                "metadata/maven-metadata.xml",
            ],
        );

        let files: Vec<StagedFile> = staged_files(dir.path(), DEFAULT_METADATA_DIR, &IgnoreRules::default())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|f| f.relative_path.to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["metadata/maven-metadata.xml", "mylib-1.0.3-base.jar"]);
    }

    #[test]
    fn test_walk_is_restartable() {
        let dir = TempDir::new().unwrap();
        stage(dir.path(), &["a.jar", "b.jar", "sub/c.pom"]);

        let ignore = IgnoreRules::default();
        let first: Vec<_> = staged_files(dir.path(), DEFAULT_METADATA_DIR, &ignore)
            .unwrap()
            .map(|f| f.unwrap().path)
            .collect();
        let second: Vec<_> = staged_files(dir.path(), DEFAULT_METADATA_DIR, &ignore)
            .unwrap()
            .map(|f| f.unwrap().path)
            .collect();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_walk_respects_ignore_rules() {
        let dir = TempDir::new().unwrap();
        stage(dir.path(), &["a.jar", ".DS_Store"]);

        let ignore = IgnoreRules::new(&["**/.DS_Store"]).unwrap();
        let files: Vec<_> = staged_files(dir.path(), DEFAULT_METADATA_DIR, &ignore)
            .unwrap()
            .map(|f| f.unwrap().file_name())
            .collect();
        assert_eq!(files, vec!["a.jar"]);
    }

    #[test]
    fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = staged_files(&missing, DEFAULT_METADATA_DIR, &IgnoreRules::default())
            .err()
            .unwrap();
        assert!(matches!(err, StagingError::RootMissing(_)));
    }

    #[test]
    fn test_verify_required_reports_missing_role() {
        let dir = TempDir::new().unwrap();
        stage(dir.path(), &["mylib-1.0.3-base.jar", "pom-default.xml", "mylib-1.0.3-sources.jar"]);

        let err = verify_required(
            dir.path(),
            &coordinate(),
            DEFAULT_REQUIRED_ROLES,
            DEFAULT_METADATA_DIR,
            &IgnoreRules::default(),
        )
        .unwrap_err();

        match err {
            StagingError::Missing { role, expected } => {
                assert_eq!(role, ArtifactRole::JavadocJar);
                assert!(expected.ends_with("mylib-1.0.3-javadoc.jar"));
            }
            other => panic!("expected Missing, got {:?}", other),
        }
    }

    #[test]
    fn test_verify_required_complete() {
        let dir = TempDir::new().unwrap();
        stage(
            dir.path(),
            &[
                "mylib-1.0.3-base.jar",
                "pom-default.xml",
                "mylib-1.0.3-sources.jar",
                "mylib-1.0.3-javadoc.jar",
            ],
        );

        verify_required(
            dir.path(),
            &coordinate(),
            DEFAULT_REQUIRED_ROLES,
            DEFAULT_METADATA_DIR,
            &IgnoreRules::default(),
        )
        .unwrap();
    }
}
