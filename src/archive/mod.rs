//! Maven repository bundle assembly
//!
//! Lays the staged files out under `groupPath/artifactId/version`, renames
//! the generated POM and base jar to their canonical names, places the
//! metadata subdirectory one level up under `groupPath/artifactId`, and
//! writes everything into a single compressed archive.

mod rename;
mod writer;

pub use rename::{default_rule_configs, RenameError, RenameRule, RenameRuleConfig, RenameRules};
pub use writer::list_entries;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::coordinate::RepositoryCoordinate;
use crate::staging::{IgnoreRules, StagingError, DEFAULT_METADATA_DIR};

/// Errors from archive assembly
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("compression error: {0}")]
    Encode(#[source] io::Error),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error("staging root {} contains no files", .0.display())]
    Empty(PathBuf),

    #[error("cannot determine archive format of {}", .0.display())]
    UnknownFormat(PathBuf),
}

/// Output archive format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveFormat {
    /// Deflated zip (what repository upload portals accept)
    #[default]
    Zip,
    /// Gzip-compressed tar
    #[serde(rename = "tar.gz")]
    TarGz,
}

impl ArchiveFormat {
    /// File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }

    /// Detect the format from an archive path
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else {
            None
        }
    }

    /// `<projectName>-<version>-maven.<ext>`
    pub fn default_file_name(&self, project_name: &str, version: &str) -> String {
        format!("{}-{}-maven.{}", project_name, version, self.extension())
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar.gz" | "tgz" | "tar-gz" => Ok(ArchiveFormat::TarGz),
            other => Err(format!("unknown archive format: {}", other)),
        }
    }
}

/// A file copied into the archive under a (possibly renamed) target path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub source: PathBuf,
    pub target: String,
}

/// The full, ordered set of entries to write
#[derive(Debug, Clone, Default)]
pub struct ArchivePlan {
    entries: BTreeMap<String, PathBuf>,
    duplicates: usize,
}

impl ArchivePlan {
    /// Add an entry; a later entry for the same target replaces the earlier one
    pub fn insert(&mut self, source: PathBuf, target: String) {
        if let Some(previous) = self.entries.insert(target.clone(), source) {
            self.duplicates += 1;
            warn!(
                target = %target,
                replaced = %previous.display(),
                "duplicate archive path, keeping the last file"
            );
        }
    }

    /// Entries sorted by target path
    pub fn entries(&self) -> impl Iterator<Item = ArchiveEntry> + '_ {
        self.entries.iter().map(|(target, source)| ArchiveEntry {
            source: source.clone(),
            target: target.clone(),
        })
    }

    /// Target paths in archive order
    pub fn targets(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Source file planned for a target path
    pub fn source_for(&self, target: &str) -> Option<&Path> {
        self.entries.get(target).map(PathBuf::as_path)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the plan has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many target collisions were resolved by "last write wins"
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

/// Result of writing an archive
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub format: ArchiveFormat,
    pub entries: Vec<String>,
    pub sha256: String,
    pub size: u64,
    pub duplicates: usize,
}

/// Builds the repository bundle for one coordinate
#[derive(Debug, Clone)]
pub struct Archiver {
    coordinate: RepositoryCoordinate,
    rules: RenameRules,
    format: ArchiveFormat,
    metadata_dir: String,
    ignore: IgnoreRules,
}

impl Archiver {
    /// Archiver with the default rename rules and zip output
    pub fn new(coordinate: RepositoryCoordinate) -> Self {
        let rules = RenameRules::defaults(&coordinate);
        Self {
            coordinate,
            rules,
            format: ArchiveFormat::default(),
            metadata_dir: DEFAULT_METADATA_DIR.to_string(),
            ignore: IgnoreRules::default(),
        }
    }

    /// Replace the rename rules
    pub fn with_rules(mut self, rules: RenameRules) -> Self {
        self.rules = rules;
        self
    }

    /// Set the output format
    pub fn with_format(mut self, format: ArchiveFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the metadata subdirectory name
    pub fn with_metadata_dir(mut self, metadata_dir: impl Into<String>) -> Self {
        self.metadata_dir = metadata_dir.into();
        self
    }

    /// Leave out files matching `ignore`
    pub fn with_ignore(mut self, ignore: IgnoreRules) -> Self {
        self.ignore = ignore;
        self
    }

    /// Coordinate being packaged
    pub fn coordinate(&self) -> &RepositoryCoordinate {
        &self.coordinate
    }

    /// Compute the target path of every file under `root`
    pub fn plan(&self, root: &Path) -> Result<ArchivePlan, ArchiveError> {
        plan_entries(
            root,
            &self.coordinate,
            &self.rules,
            &self.metadata_dir,
            &self.ignore,
        )
    }

    /// Write the archive for `root` to `output`.
    ///
    /// The archive is written to a temporary file next to `output` and
    /// moved into place only once complete.
    pub fn assemble(&self, root: &Path, output: &Path) -> Result<ArchiveSummary, ArchiveError> {
        let plan = self.plan(root)?;
        if plan.is_empty() {
            return Err(ArchiveError::Empty(root.to_path_buf()));
        }

        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| ArchiveError::Io { path, source }
        };

        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(io_err(&parent))?;

        let tmp = NamedTempFile::new_in(&parent).map_err(io_err(&parent))?;
        let tmp = match self.format {
            ArchiveFormat::Zip => writer::write_zip(tmp, &plan)?,
            ArchiveFormat::TarGz => writer::write_tar_gz(tmp, &plan)?,
        };
        tmp.as_file().sync_all().map_err(io_err(tmp.path()))?;
        tmp.persist(output)
            .map_err(|e| ArchiveError::Io {
                path: output.to_path_buf(),
                source: e.error,
            })?;

        let bytes = fs::read(output).map_err(io_err(output))?;
        let summary = ArchiveSummary {
            path: output.to_path_buf(),
            format: self.format,
            entries: plan.targets(),
            sha256: hex::encode(Sha256::digest(&bytes)),
            size: bytes.len() as u64,
            duplicates: plan.duplicates(),
        };

        info!(
            path = %output.display(),
            entries = summary.entries.len(),
            size = summary.size,
            "archive written"
        );
        Ok(summary)
    }
}

/// Compute the target path of every file under `root`.
///
/// Only files become entries. Files under the metadata subdirectory land
/// in `groupPath/artifactId`; all others in the versioned directory with
/// renames applied to their file name.
pub fn plan_entries(
    root: &Path,
    coordinate: &RepositoryCoordinate,
    rules: &RenameRules,
    metadata_dir: &str,
    ignore: &IgnoreRules,
) -> Result<ArchivePlan, ArchiveError> {
    if !root.is_dir() {
        return Err(StagingError::RootMissing(root.to_path_buf()).into());
    }

    let version_dir = coordinate.version_dir();
    let artifact_dir = coordinate.artifact_dir();
    let mut plan = ArchivePlan::default();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry.map_err(StagingError::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let rel_path = path
            .strip_prefix(root)
            .map_err(|_| StagingError::OutsideRoot(path.to_path_buf()))?;

        if ignore.is_ignored(rel_path) {
            continue;
        }

        let segments = path_segments(rel_path);
        let target = match segments.split_first() {
            Some((first, rest)) if first == metadata_dir && !rest.is_empty() => {
                format!("{}/{}", artifact_dir, rest.join("/"))
            }
            _ => {
                let (name, parents) = match segments.split_last() {
                    Some(split) => split,
                    None => continue,
                };
                let mut target = version_dir.clone();
                for parent in parents {
                    target.push('/');
                    target.push_str(parent);
                }
                target.push('/');
                target.push_str(&rules.apply(name));
                target
            }
        };

        debug!(source = %rel_path.display(), target = %target, "planned entry");
        plan.insert(path.to_path_buf(), target);
    }

    Ok(plan)
}

fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn coordinate() -> RepositoryCoordinate {
        RepositoryCoordinate::new("dev.sbs", "mylib", "1.0.3").unwrap()
    }

    fn stage(dir: &Path, names: &[&str]) {
        for name in names {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, name.as_bytes()).unwrap();
        }
    }

    #[test]
    fn test_plan_applies_renames_and_layout() {
        let dir = TempDir::new().unwrap();
        stage(
            dir.path(),
            &[
                "mylib-1.0.3-base.jar",
                "mylib-1.0.3-base.jar.sha1",
                "pom-default.xml",
                "pom-default.xml.md5",
                "mylib-1.0.3-sources.jar",
                "metadata/maven-metadata.xml",
            ],
        );

        let plan = Archiver::new(coordinate()).plan(dir.path()).unwrap();
        assert_eq!(
            plan.targets(),
            vec![
                "dev/sbs/mylib/1.0.3/mylib-1.0.3-sources.jar",
                "dev/sbs/mylib/1.0.3/mylib-1.0.3.jar",
                "dev/sbs/mylib/1.0.3/mylib-1.0.3.jar.sha1",
                "dev/sbs/mylib/1.0.3/mylib-1.0.3.pom",
                "dev/sbs/mylib/1.0.3/mylib-1.0.3.pom.md5",
                "dev/sbs/mylib/maven-metadata.xml",
            ]
        );
        assert_eq!(plan.duplicates(), 0);
    }

    #[test]
    fn test_plan_keeps_nested_directories() {
        let dir = TempDir::new().unwrap();
        stage(dir.path(), &["extra/notes/pom-default.xml"]);

        let plan = Archiver::new(coordinate()).plan(dir.path()).unwrap();
        assert_eq!(
            plan.targets(),
            vec!["dev/sbs/mylib/1.0.3/extra/notes/mylib-1.0.3.pom"]
        );
    }

    #[test]
    fn test_duplicate_target_last_write_wins() {
        let dir = TempDir::new().unwrap();
        // Both map to mylib-1.0.3.jar; walk order is sorted, so the
        // canonical name (visited last) replaces the renamed base jar.
        stage(dir.path(), &["mylib-1.0.3-base.jar", "mylib-1.0.3.jar"]);

        let plan = Archiver::new(coordinate()).plan(dir.path()).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.duplicates(), 1);
        let source = plan.source_for("dev/sbs/mylib/1.0.3/mylib-1.0.3.jar").unwrap();
        assert!(source.ends_with("mylib-1.0.3.jar"));
    }

    #[test]
    fn test_assemble_zip_round_trip() {
        let staging = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        stage(staging.path(), &["mylib-1.0.3-base.jar", "pom-default.xml"]);

        let output = out.path().join("dist/mylib-1.0.3-maven.zip");
        let summary = Archiver::new(coordinate())
            .assemble(staging.path(), &output)
            .unwrap();

        assert_eq!(summary.format, ArchiveFormat::Zip);
        assert_eq!(summary.sha256.len(), 64);
        let listed = list_entries(&output).unwrap();
        assert_eq!(listed, summary.entries);
        assert_eq!(
            listed,
            vec![
                "dev/sbs/mylib/1.0.3/mylib-1.0.3.jar",
                "dev/sbs/mylib/1.0.3/mylib-1.0.3.pom",
            ]
        );
    }

    #[test]
    fn test_assemble_tar_gz_round_trip() {
        let staging = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        stage(staging.path(), &["pom-default.xml", "metadata/maven-metadata.xml"]);

        let output = out.path().join("bundle.tar.gz");
        Archiver::new(coordinate())
            .with_format(ArchiveFormat::TarGz)
            .assemble(staging.path(), &output)
            .unwrap();

        assert_eq!(
            list_entries(&output).unwrap(),
            vec![
                "dev/sbs/mylib/1.0.3/mylib-1.0.3.pom",
                "dev/sbs/mylib/maven-metadata.xml",
            ]
        );
    }

    #[test]
    fn test_assemble_is_byte_deterministic() {
        let staging = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        stage(staging.path(), &["mylib-1.0.3-base.jar", "pom-default.xml"]);

        for format in [ArchiveFormat::Zip, ArchiveFormat::TarGz] {
            let archiver = Archiver::new(coordinate()).with_format(format);
            let a = archiver
                .assemble(staging.path(), &out.path().join(format!("a.{}", format.extension())))
                .unwrap();
            let b = archiver
                .assemble(staging.path(), &out.path().join(format!("b.{}", format.extension())))
                .unwrap();
            assert_eq!(a.sha256, b.sha256, "{} output differs", format);
        }
    }

    #[test]
    fn test_assemble_empty_staging() {
        let staging = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let output = out.path().join("x.zip");
        let err = Archiver::new(coordinate())
            .assemble(staging.path(), &output)
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Empty(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("zip".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Zip);
        assert_eq!("tar.gz".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::TarGz);
        assert_eq!("tgz".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::TarGz);
        assert_eq!("TAR-GZ".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::TarGz);
        assert!("rar".parse::<ArchiveFormat>().is_err());
        assert_eq!(
            ArchiveFormat::from_path(Path::new("x/bundle.TGZ")),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::Zip.default_file_name("MyLib", "1.0.3"),
            "MyLib-1.0.3-maven.zip"
        );
    }

    #[test]
    fn test_list_unknown_format() {
        let err = list_entries(Path::new("bundle.rar")).unwrap_err();
        assert!(matches!(err, ArchiveError::UnknownFormat(_)));
    }
}
