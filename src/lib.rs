//! Maven repository bundle builder
//!
//! Turns a directory of release build outputs into an upload-ready Maven
//! repository bundle: every artifact gets checksum sidecars and a
//! detached signature, then the whole set is renamed into the
//! `groupPath/artifactId/version` layout and written as one archive.

pub mod archive;
pub mod checksum;
pub mod collect;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod signing;
pub mod staging;

pub use archive::{ArchiveFormat, ArchiveSummary, Archiver, RenameRules};
pub use collect::{CollectReport, Collector};
pub use config::{EffectiveConfig, ReleaseConfig};
pub use coordinate::RepositoryCoordinate;
pub use error::{ExitCode, ReleaseError};
pub use pipeline::{BundleReport, ReleasePipeline};
pub use signing::{CommandSigner, SignatureManager, Signer};
