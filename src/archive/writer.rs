//! Archive encoders
//!
//! Both formats are written canonically: entries in sorted order, fixed
//! timestamps, fixed permissions. Identical inputs give identical bytes.

use std::fs::{self, File};
use std::io::{Seek, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, Header};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{ArchiveError, ArchiveFormat, ArchivePlan};

const FILE_MODE: u32 = 0o644;

/// Write every planned entry as a deflated zip archive
pub(crate) fn write_zip<W: Write + Seek>(writer: W, plan: &ArchivePlan) -> Result<W, ArchiveError> {
    let mut zip = ZipWriter::new(writer);

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(FILE_MODE);

    for entry in plan.entries() {
        let bytes = read_source(&entry.source)?;
        zip.start_file(entry.target.as_str(), options)?;
        zip.write_all(&bytes).map_err(|source| ArchiveError::Io {
            path: entry.source.clone(),
            source,
        })?;
    }

    Ok(zip.finish()?)
}

/// Write every planned entry as a gzip-compressed tar archive
pub(crate) fn write_tar_gz<W: Write>(writer: W, plan: &ArchivePlan) -> Result<W, ArchiveError> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut builder = Builder::new(encoder);

    for entry in plan.entries() {
        let bytes = read_source(&entry.source)?;

        // Canonical header: epoch mtime, root ownership, fixed mode
        let mut header = Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_mode(FILE_MODE);
        header.set_entry_type(tar::EntryType::Regular);

        builder
            .append_data(&mut header, &entry.target, bytes.as_slice())
            .map_err(|source| ArchiveError::Io {
                path: entry.source.clone(),
                source,
            })?;
    }

    let encoder = builder.into_inner().map_err(ArchiveError::Encode)?;
    encoder.finish().map_err(ArchiveError::Encode)
}

/// List the entry names of an archive on disk
pub fn list_entries(path: &Path) -> Result<Vec<String>, ArchiveError> {
    let format = ArchiveFormat::from_path(path)
        .ok_or_else(|| ArchiveError::UnknownFormat(path.to_path_buf()))?;
    let file = File::open(path).map_err(|source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match format {
        ArchiveFormat::Zip => {
            let mut archive = ZipArchive::new(file)?;
            let mut names = Vec::with_capacity(archive.len());
            for i in 0..archive.len() {
                names.push(archive.by_index(i)?.name().to_string());
            }
            Ok(names)
        }
        ArchiveFormat::TarGz => {
            let io_err = |source: std::io::Error| ArchiveError::Io {
                path: path.to_path_buf(),
                source,
            };
            let mut archive = tar::Archive::new(GzDecoder::new(file));
            let mut names = Vec::new();
            for entry in archive.entries().map_err(io_err)? {
                let entry = entry.map_err(io_err)?;
                let entry_path = entry.path().map_err(io_err)?;
                names.push(entry_path.to_string_lossy().to_string());
            }
            Ok(names)
        }
    }
}

fn read_source(path: &Path) -> Result<Vec<u8>, ArchiveError> {
    fs::read(path).map_err(|source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    })
}
