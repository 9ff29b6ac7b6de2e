//! End-to-end release pipeline
//!
//! Steps, in order:
//! 1. parse checksum algorithms (before any file is touched)
//! 2. resolve the coordinate, optionally import local metadata
//! 3. verify the staging root holds every required artifact
//! 4. checksum and sign every staged file
//! 5. assemble the repository archive
//!
//! The first failure aborts the run. Sidecars written before a failure
//! stay on disk; the archive is only created once step 4 succeeded.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::archive::{ArchiveSummary, Archiver, RenameRules};
use crate::collect::{CollectReport, Collector};
use crate::config::ReleaseConfig;
use crate::coordinate::RepositoryCoordinate;
use crate::error::ReleaseError;
use crate::metadata::{default_local_repository, import_local_metadata};
use crate::signing::{
    CommandSigner, FreshnessPolicy, SignatureLedger, SignatureManager, Signer,
};
use crate::staging::{verify_required, IgnoreRules, StagingError};
use maven_digest::{parse_algorithms, DigestAlgorithm};

/// Schema version for the bundle report
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for the bundle report
pub const REPORT_SCHEMA_ID: &str = "maven-bundle/bundle_report@1";

/// Outcome of a full run
#[derive(Debug, Clone, Serialize)]
pub struct BundleReport {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,
    pub coordinate: RepositoryCoordinate,
    /// Metadata file copied from the local repository, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported_metadata: Option<PathBuf>,
    pub collected: CollectReport,
    pub archive: ArchiveSummary,
}

impl BundleReport {
    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Inputs resolved before the staging root is touched
struct Prepared {
    algorithms: Vec<DigestAlgorithm>,
    coordinate: RepositoryCoordinate,
    ignore: IgnoreRules,
}

/// Drives checksum generation, signing and archiving for one release
pub struct ReleasePipeline {
    config: ReleaseConfig,
    signer: Option<Box<dyn Signer>>,
}

impl ReleasePipeline {
    /// Pipeline signing with the configured external command
    pub fn new(config: ReleaseConfig) -> Self {
        Self {
            config,
            signer: None,
        }
    }

    /// Sign through `signer` instead of the configured command
    pub fn with_signer(mut self, signer: Box<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &ReleaseConfig {
        &self.config
    }

    /// Run every step and write the archive
    pub fn run(&mut self) -> Result<BundleReport, ReleaseError> {
        let prepared = self.prepare()?;
        let imported_metadata = self.import_metadata(&prepared.coordinate)?;
        self.verify(&prepared)?;
        let collected = self.collect_with(&prepared)?;
        let archive = self.assemble_with(&prepared)?;

        Ok(BundleReport {
            schema_version: REPORT_SCHEMA_VERSION,
            schema_id: REPORT_SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            coordinate: prepared.coordinate,
            imported_metadata,
            collected,
            archive,
        })
    }

    /// Checksum and sign the staging root without archiving
    pub fn collect(&mut self) -> Result<CollectReport, ReleaseError> {
        let prepared = self.prepare()?;
        self.import_metadata(&prepared.coordinate)?;
        self.verify(&prepared)?;
        self.collect_with(&prepared)
    }

    /// Archive the staging root as it is, without checksumming or signing
    pub fn assemble(&self) -> Result<ArchiveSummary, ReleaseError> {
        let prepared = self.prepare()?;
        self.verify(&prepared)?;
        self.assemble_with(&prepared)
    }

    /// Archive path the configuration resolves to
    pub fn output_path(&self) -> Result<PathBuf, ReleaseError> {
        let coordinate = self.config.project.coordinate()?;
        Ok(self.config.archive.output_path(&self.config.project, &coordinate))
    }

    fn staging_root(&self) -> &Path {
        &self.config.staging.root
    }

    fn prepare(&self) -> Result<Prepared, ReleaseError> {
        let algorithms = parse_algorithms(&self.config.checksums.algorithms)?;
        let coordinate = self.config.project.coordinate()?;

        let mut ignore = IgnoreRules::new(&self.config.staging.ignore)?;
        if let Some(path) = &self.config.staging.ignore_file {
            ignore = ignore.with_ignore_file(path)?;
        }

        info!(
            coordinate = %coordinate,
            algorithms = ?algorithms.iter().map(|a| a.name()).collect::<Vec<_>>(),
            "release prepared"
        );
        Ok(Prepared {
            algorithms,
            coordinate,
            ignore,
        })
    }

    fn import_metadata(&self, coordinate: &RepositoryCoordinate) -> Result<Option<PathBuf>, ReleaseError> {
        if !self.config.metadata.import_local {
            return Ok(None);
        }

        let root = self.staging_root();
        if !root.is_dir() {
            return Err(StagingError::RootMissing(root.to_path_buf()).into());
        }

        let local_repository = match &self.config.metadata.local_repository {
            Some(path) => path.clone(),
            None => match default_local_repository() {
                Some(path) => path,
                None => {
                    warn!("HOME is not set, skipping local metadata import");
                    return Ok(None);
                }
            },
        };

        import_local_metadata(
            &local_repository,
            coordinate,
            root,
            &self.config.staging.metadata_dir,
        )
        .map_err(|source| ReleaseError::Io {
            path: root.join(&self.config.staging.metadata_dir),
            source,
        })
    }

    fn verify(&self, prepared: &Prepared) -> Result<(), ReleaseError> {
        verify_required(
            self.staging_root(),
            &prepared.coordinate,
            &self.config.staging.required,
            &self.config.staging.metadata_dir,
            &prepared.ignore,
        )?;
        Ok(())
    }

    fn signature_manager(&mut self) -> Result<Option<SignatureManager>, ReleaseError> {
        let signing = &self.config.signing;
        if !signing.enabled {
            info!("signing disabled");
            return Ok(None);
        }

        let signer = match self.signer.take() {
            Some(signer) => signer,
            None => {
                let mut command = CommandSigner::new(signing.program.clone(), signing.args.clone())
                    .with_timeout(Duration::from_secs(signing.timeout_seconds));
                if let Some(key_id) = &signing.key_id {
                    command = command.with_key_id(key_id);
                }
                Box::new(command)
            }
        };

        let manager = SignatureManager::new(signer);
        let manager = match signing.freshness {
            FreshnessPolicy::Mtime => manager,
            FreshnessPolicy::ContentHash => manager.with_ledger(SignatureLedger::load(&signing.ledger)?),
        };
        Ok(Some(manager))
    }

    fn collect_with(&mut self, prepared: &Prepared) -> Result<CollectReport, ReleaseError> {
        let mut collector = Collector::new(prepared.algorithms.clone())
            .with_ignore(prepared.ignore.clone())
            .with_metadata_dir(self.config.staging.metadata_dir.clone());
        if let Some(manager) = self.signature_manager()? {
            collector = collector.with_signatures(manager);
        }

        Ok(collector.run(self.staging_root())?)
    }

    fn assemble_with(&self, prepared: &Prepared) -> Result<ArchiveSummary, ReleaseError> {
        let rules = RenameRules::from_configs(&self.config.archive.rename, &prepared.coordinate)?;
        let output = self
            .config
            .archive
            .output_path(&self.config.project, &prepared.coordinate);

        let archiver = Archiver::new(prepared.coordinate.clone())
            .with_rules(rules)
            .with_format(self.config.archive.format)
            .with_metadata_dir(self.config.staging.metadata_dir.clone())
            .with_ignore(prepared.ignore.clone());

        Ok(archiver.assemble(self.staging_root(), &output)?)
    }
}
