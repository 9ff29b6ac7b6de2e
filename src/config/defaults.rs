//! Built-in defaults (layer 1)
//!
//! Mirrors the directory layout of a Gradle `maven-publish` release build.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::archive::default_rule_configs;
use crate::signing::{DEFAULT_ARGS, DEFAULT_PROGRAM, DEFAULT_TIMEOUT_SECONDS};
use crate::staging::{DEFAULT_METADATA_DIR, DEFAULT_REQUIRED_ROLES};
use maven_digest::DEFAULT_ALGORITHMS;

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Staging root (default: "build/publications/release")
    pub staging_root: String,

    /// Metadata subdirectory of the staging root (default: "metadata")
    pub metadata_dir: String,

    /// Digest algorithms (default: SHA-1, MD5)
    pub algorithms: Vec<String>,

    /// Whether signing runs (default: true)
    pub signing_enabled: bool,

    /// Signing program (default: "gpg")
    pub signing_program: String,

    /// Signing timeout in seconds (default: 300)
    pub signing_timeout_seconds: u64,

    /// Freshness policy (default: "mtime")
    pub signing_freshness: String,

    /// Content-hash ledger location
    pub signing_ledger: String,

    /// Archive output directory (default: "build/distributions")
    pub output_dir: String,

    /// Archive format (default: "zip")
    pub archive_format: String,

    /// Import `maven-metadata-local.xml` from the local repository (default: false)
    pub import_local_metadata: bool,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            staging_root: "build/publications/release".to_string(),
            metadata_dir: DEFAULT_METADATA_DIR.to_string(),
            algorithms: DEFAULT_ALGORITHMS.iter().map(|a| a.name().to_string()).collect(),
            signing_enabled: true,
            signing_program: DEFAULT_PROGRAM.to_string(),
            signing_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            signing_freshness: "mtime".to_string(),
            signing_ledger: "build/tmp/signature-ledger.json".to_string(),
            output_dir: "build/distributions".to_string(),
            archive_format: "zip".to_string(),
            import_local_metadata: false,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> Value {
        let required: Vec<String> = DEFAULT_REQUIRED_ROLES.iter().map(|r| r.to_string()).collect();

        serde_json::json!({
            "project": {
                "group_id": "",
                "name": "",
                "artifact_id": null,
                "version": ""
            },
            "staging": {
                "root": self.staging_root,
                "metadata_dir": self.metadata_dir,
                "required": required,
                "ignore": [],
                "ignore_file": null
            },
            "checksums": {
                "algorithms": self.algorithms
            },
            "signing": {
                "enabled": self.signing_enabled,
                "program": self.signing_program,
                "args": DEFAULT_ARGS,
                "key_id": null,
                "timeout_seconds": self.signing_timeout_seconds,
                "freshness": self.signing_freshness,
                "ledger": self.signing_ledger
            },
            "archive": {
                "output_dir": self.output_dir,
                "file_name": null,
                "format": self.archive_format,
                "rename": default_rule_configs()
            },
            "metadata": {
                "import_local": self.import_local_metadata,
                "local_repository": null
            }
        })
    }
}
