//! Shared fixtures for the integration tests
//!
//! - staging roots laid out like a Gradle `maven-publish` release build
//! - a recording signer that never spawns a process
//! - release configs pointing at temporary directories

#![allow(dead_code)]

use maven_bundle::config::{deep_merge, EffectiveConfig, ReleaseConfig};
use maven_bundle::signing::{signature_path, SigningError};
use maven_bundle::Signer;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const GROUP_ID: &str = "dev.sbs";
pub const ARTIFACT_ID: &str = "mylib";
pub const VERSION: &str = "1.0.3";

/// The four artifacts a release build stages
pub const RELEASE_FILES: &[&str] = &[
    "mylib-1.0.3-base.jar",
    "mylib-1.0.3-sources.jar",
    "mylib-1.0.3-javadoc.jar",
    "pom-default.xml",
];

/// Write each named file under `root` with distinct content
pub fn stage(root: &Path, names: &[&str]) {
    for name in names {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, format!("content of {}", name)).unwrap();
    }
}

/// A fresh staging root holding a complete release
pub fn release_staging() -> TempDir {
    let dir = TempDir::new().unwrap();
    stage(dir.path(), RELEASE_FILES);
    dir
}

/// Release config for the test coordinate; `overrides` is merged last
pub fn release_config(staging: &Path, output_dir: &Path, overrides: Value) -> ReleaseConfig {
    let base = json!({
        "project": {"group_id": GROUP_ID, "name": ARTIFACT_ID, "version": VERSION},
        "staging": {"root": staging},
        "archive": {"output_dir": output_dir}
    });
    EffectiveConfig::build(None, Some(deep_merge(base, overrides)))
        .unwrap()
        .release()
        .unwrap()
}

/// Snapshot every sidecar under `root` as (relative path, bytes)
pub fn sidecars(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut found = Vec::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.unwrap();
        let path = entry.path();
        let is_sidecar = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("sha1" | "md5" | "asc")
        );
        if entry.file_type().is_file() && is_sidecar {
            found.push((
                path.strip_prefix(root).unwrap().to_path_buf(),
                fs::read(path).unwrap(),
            ));
        }
    }
    found
}

/// Signer that records every call and writes a fake armored signature
#[derive(Clone, Default)]
pub struct RecordingSigner {
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl RecordingSigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Signer for RecordingSigner {
    fn sign(&self, path: &Path) -> Result<(), SigningError> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        fs::write(
            signature_path(path),
            format!("-----BEGIN PGP SIGNATURE-----\n{}\n", path.display()),
        )
        .map_err(|source| SigningError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Config overrides that run `sh -c <script>` as the signing tool.
///
/// The file to sign arrives as `$1`.
pub fn shell_signing(script: &str, timeout_seconds: u64) -> Value {
    json!({
        "signing": {
            "enabled": true,
            "program": "sh",
            "args": ["-c", script, "sign"],
            "timeout_seconds": timeout_seconds
        }
    })
}
