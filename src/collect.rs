//! Artifact collection pass
//!
//! Walks the staging root once. For every qualifying file it writes one
//! checksum sidecar per configured algorithm, then makes sure the file
//! carries a fresh detached signature. The first signing failure aborts
//! the pass; sidecars already written are left in place.

use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::checksum::{write_checksums, ChecksumRecord};
use crate::signing::{SignatureManager, SignatureOutcome, SigningError};
use crate::staging::{staged_files, IgnoreRules, StagedFile, StagingError, DEFAULT_METADATA_DIR};
use maven_digest::{DigestAlgorithm, DEFAULT_ALGORITHMS};

/// Errors from a collection pass
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error("failed to write checksums for {}: {source}", .path.display())]
    Checksum {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Signing(#[from] SigningError),
}

/// Outcome for one staged file
#[derive(Debug, Clone, Serialize)]
pub struct CollectedFile {
    #[serde(flatten)]
    pub file: StagedFile,
    pub checksums: Vec<ChecksumRecord>,
    pub signature: SignatureOutcome,
}

/// Outcome of a whole pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectReport {
    pub files: Vec<CollectedFile>,
}

impl CollectReport {
    /// Number of checksum sidecars written
    pub fn checksums_written(&self) -> usize {
        self.files.iter().map(|f| f.checksums.len()).sum()
    }

    /// Number of files that received a new signature
    pub fn signed(&self) -> usize {
        self.count(SignatureOutcome::Signed)
    }

    /// Number of files whose existing signature was kept
    pub fn reused_signatures(&self) -> usize {
        self.count(SignatureOutcome::Fresh)
    }

    fn count(&self, outcome: SignatureOutcome) -> usize {
        self.files.iter().filter(|f| f.signature == outcome).count()
    }
}

/// Checksums and signs every qualifying file under a staging root
pub struct Collector {
    algorithms: Vec<DigestAlgorithm>,
    signatures: Option<SignatureManager>,
    ignore: IgnoreRules,
    metadata_dir: String,
}

impl Collector {
    /// Create a collector for the given algorithms with signing disabled
    pub fn new(algorithms: Vec<DigestAlgorithm>) -> Self {
        Self {
            algorithms,
            signatures: None,
            ignore: IgnoreRules::default(),
            metadata_dir: DEFAULT_METADATA_DIR.to_string(),
        }
    }

    /// Sign files through `manager`
    pub fn with_signatures(mut self, manager: SignatureManager) -> Self {
        self.signatures = Some(manager);
        self
    }

    /// Skip files matching `ignore`
    pub fn with_ignore(mut self, ignore: IgnoreRules) -> Self {
        self.ignore = ignore;
        self
    }

    /// Name of the metadata subdirectory (for role classification)
    pub fn with_metadata_dir(mut self, metadata_dir: impl Into<String>) -> Self {
        self.metadata_dir = metadata_dir.into();
        self
    }

    /// Algorithms written per file
    pub fn algorithms(&self) -> &[DigestAlgorithm] {
        &self.algorithms
    }

    /// Run one pass over `root`
    pub fn run(&mut self, root: &Path) -> Result<CollectReport, CollectError> {
        let mut report = CollectReport::default();

        for file in staged_files(root, &self.metadata_dir, &self.ignore)? {
            let file = file?;
            debug!(path = %file.relative_path.display(), role = %file.role, "collecting");

            let checksums =
                write_checksums(&file.path, &self.algorithms).map_err(|source| CollectError::Checksum {
                    path: file.path.clone(),
                    source,
                })?;

            let signature = match self.signatures.as_mut() {
                Some(manager) => manager.ensure_signed(&file.path)?,
                None => SignatureOutcome::Disabled,
            };

            report.files.push(CollectedFile {
                file,
                checksums,
                signature,
            });
        }

        info!(
            files = report.files.len(),
            checksums = report.checksums_written(),
            signed = report.signed(),
            reused = report.reused_signatures(),
            "collection pass complete"
        );
        Ok(report)
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new(DEFAULT_ALGORITHMS.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{signature_path, Signer};
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;
    use tempfile::TempDir;

    struct RecordingSigner {
        calls: Rc<RefCell<Vec<PathBuf>>>,
        fail_on: Option<&'static str>,
    }

    impl Signer for RecordingSigner {
        fn sign(&self, path: &Path) -> Result<(), SigningError> {
            self.calls.borrow_mut().push(path.to_path_buf());
            if let Some(name) = self.fail_on {
                if path.ends_with(name) {
                    return Err(SigningError::ToolFailed {
                        path: path.to_path_buf(),
                        program: "gpg".to_string(),
                        exit_code: Some(1),
                        stderr: String::new(),
                    });
                }
            }
            fs::write(signature_path(path), "sig").unwrap();
            Ok(())
        }
    }

    fn signing_collector(fail_on: Option<&'static str>) -> (Collector, Rc<RefCell<Vec<PathBuf>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let signer = RecordingSigner {
            calls: Rc::clone(&calls),
            fail_on,
        };
        let collector = Collector::default().with_signatures(SignatureManager::new(Box::new(signer)));
        (collector, calls)
    }

    fn staging() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("mylib-1.0.3-base.jar"), "jar").unwrap();
        fs::write(dir.path().join("pom-default.xml"), "<project/>").unwrap();
        dir
    }

    #[test]
    fn test_every_file_gets_each_checksum() {
        let dir = staging();
        let mut collector = Collector::default();
        let report = collector.run(dir.path()).unwrap();

        assert_eq!(report.files.len(), 2);
        assert_eq!(report.checksums_written(), 4);
        for name in ["mylib-1.0.3-base.jar", "pom-default.xml"] {
            assert!(dir.path().join(format!("{}.sha1", name)).exists());
            assert!(dir.path().join(format!("{}.md5", name)).exists());
        }
        assert!(report
            .files
            .iter()
            .all(|f| f.signature == SignatureOutcome::Disabled));
    }

    #[test]
    fn test_sidecars_never_processed() {
        let dir = staging();
        let (mut collector, calls) = signing_collector(None);
        collector.run(dir.path()).unwrap();
        let report = collector.run(dir.path()).unwrap();

        // No checksums of checksums, no signatures of signatures
        assert_eq!(report.files.len(), 2);
        assert!(!dir.path().join("pom-default.xml.sha1.sha1").exists());
        assert!(!dir.path().join("pom-default.xml.asc.md5").exists());
        assert!(calls
            .borrow()
            .iter()
            .all(|p| !crate::staging::is_sidecar(p)));
    }

    #[test]
    fn test_second_pass_reuses_signatures() {
        let dir = staging();
        let (mut collector, calls) = signing_collector(None);

        let first = collector.run(dir.path()).unwrap();
        assert_eq!(first.signed(), 2);

        let sha1_before = fs::read_to_string(dir.path().join("pom-default.xml.sha1")).unwrap();
        let second = collector.run(dir.path()).unwrap();
        let sha1_after = fs::read_to_string(dir.path().join("pom-default.xml.sha1")).unwrap();

        assert_eq!(second.signed(), 0);
        assert_eq!(second.reused_signatures(), 2);
        assert_eq!(calls.borrow().len(), 2);
        assert_eq!(sha1_before, sha1_after);
    }

    #[test]
    fn test_signing_failure_aborts_pass() {
        let dir = staging();
        let (mut collector, _) = signing_collector(Some("pom-default.xml"));

        let err = collector.run(dir.path()).unwrap_err();
        assert!(matches!(err, CollectError::Signing(_)));

        // Sorted walk visits the jar first; its outputs stay in place
        assert!(dir.path().join("mylib-1.0.3-base.jar.sha1").exists());
        assert!(dir.path().join("mylib-1.0.3-base.jar.asc").exists());
        // The failing file was checksummed before signing was attempted
        assert!(dir.path().join("pom-default.xml.sha1").exists());
        assert!(!dir.path().join("pom-default.xml.asc").exists());
    }

    #[test]
    fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        let err = Collector::default()
            .run(&dir.path().join("missing"))
            .unwrap_err();
        assert!(matches!(err, CollectError::Staging(StagingError::RootMissing(_))));
    }
}
