//! Repository metadata import
//!
//! A local `install` leaves `maven-metadata-local.xml` in the local
//! repository. Copying it into the staging metadata directory lets the
//! bundle ship a repository-level descriptor next to the versioned tree.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::coordinate::RepositoryCoordinate;

/// File name written by a local install
pub const LOCAL_METADATA_NAME: &str = "maven-metadata-local.xml";

/// File name expected inside the bundle
pub const METADATA_NAME: &str = "maven-metadata.xml";

/// `$HOME/.m2/repository`, if a home directory is known
pub fn default_local_repository() -> Option<PathBuf> {
    env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join(".m2").join("repository"))
}

/// Where the local install keeps metadata for `coordinate`
pub fn local_metadata_path(local_repository: &Path, coordinate: &RepositoryCoordinate) -> PathBuf {
    let mut path = local_repository.to_path_buf();
    for segment in coordinate.group_id.split('.') {
        path.push(segment);
    }
    path.push(&coordinate.artifact_id);
    path.push(LOCAL_METADATA_NAME);
    path
}

/// Copy the local repository metadata into `<staging_root>/<metadata_dir>`.
///
/// An identical copy already in place is left untouched so its mtime does
/// not mark it stale. Returns the destination path, or `None` when the
/// local repository has no metadata for this coordinate.
pub fn import_local_metadata(
    local_repository: &Path,
    coordinate: &RepositoryCoordinate,
    staging_root: &Path,
    metadata_dir: &str,
) -> io::Result<Option<PathBuf>> {
    let source = local_metadata_path(local_repository, coordinate);
    if !source.is_file() {
        warn!(
            path = %source.display(),
            "no local repository metadata found, bundle will not include maven-metadata.xml"
        );
        return Ok(None);
    }

    let dest_dir = staging_root.join(metadata_dir);
    fs::create_dir_all(&dest_dir)?;
    let dest = dest_dir.join(METADATA_NAME);
    let contents = fs::read(&source)?;
    if dest.is_file() && fs::read(&dest)? == contents {
        debug!(path = %dest.display(), "repository metadata already up to date");
        return Ok(Some(dest));
    }
    fs::write(&dest, &contents)?;

    info!(from = %source.display(), to = %dest.display(), "imported repository metadata");
    Ok(Some(dest))
}
