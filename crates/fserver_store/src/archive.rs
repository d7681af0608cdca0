//! Bundle archive extraction.
//!
//! Bundles are tar archives, optionally gzip-compressed. Only regular files
//! and directories are materialised; every entry path must stay inside the
//! destination.

use crate::error::{Result, StoreError};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::{debug, warn};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a bundle, transparently decompressing gzip.
fn open_archive(path: &Path) -> Result<Archive<Box<dyn Read>>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let compressed = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    let reader: Box<dyn Read> = if compressed {
        Box::new(GzDecoder::new(reader))
    } else {
        Box::new(reader)
    };
    Ok(Archive::new(reader))
}

/// Normalise an entry path: drop `.` components, reject anything that
/// could escape the destination.
fn relative_entry_path(path: &Path) -> Result<PathBuf> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StoreError::extraction_failed(format!(
                    "Archive entry '{}' escapes the extraction directory",
                    path.display()
                )));
            }
        }
    }
    Ok(clean)
}

fn extraction_error(archive_path: &Path, err: std::io::Error) -> StoreError {
    StoreError::extraction_failed(format!(
        "Failed to extract {}: {}",
        archive_path.display(),
        err
    ))
}

/// Extract the first regular-file entry whose normalised path satisfies
/// `wanted` into `dest_dir`, flattened to its file name. Returns the
/// extracted path, or `None` if no entry matched.
pub fn extract_member<F>(archive_path: &Path, dest_dir: &Path, wanted: F) -> Result<Option<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    let mut archive = open_archive(archive_path)?;
    let entries = archive
        .entries()
        .map_err(|e| extraction_error(archive_path, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| extraction_error(archive_path, e))?;
        if entry.header().entry_type() != EntryType::Regular {
            continue;
        }
        let path = entry
            .path()
            .map_err(|e| extraction_error(archive_path, e))?
            .into_owned();
        let path = relative_entry_path(&path)?;
        if !wanted(&path) {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let dest_path = dest_dir.join(file_name);
        entry
            .unpack(&dest_path)
            .map_err(|e| extraction_error(archive_path, e))?;
        debug!(
            "Extracted {} from {}",
            path.display(),
            archive_path.display()
        );
        return Ok(Some(dest_path));
    }
    Ok(None)
}

/// Extract every regular file and directory into `dest_dir`. Returns the
/// number of files written.
pub fn extract_all(archive_path: &Path, dest_dir: &Path) -> Result<usize> {
    let mut archive = open_archive(archive_path)?;
    let entries = archive
        .entries()
        .map_err(|e| extraction_error(archive_path, e))?;
    let mut files = 0usize;

    for entry in entries {
        let mut entry = entry.map_err(|e| extraction_error(archive_path, e))?;
        let entry_type = entry.header().entry_type();
        let path = entry
            .path()
            .map_err(|e| extraction_error(archive_path, e))?
            .into_owned();
        let relative = relative_entry_path(&path)?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let dest_path = dest_dir.join(&relative);

        match entry_type {
            EntryType::Directory => {
                fs::create_dir_all(&dest_path)?;
            }
            EntryType::Regular => {
                if let Some(parent) = dest_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                entry
                    .unpack(&dest_path)
                    .map_err(|e| extraction_error(archive_path, e))?;
                files += 1;
            }
            other => {
                warn!(
                    "Skipping {:?} entry {} in {}",
                    other,
                    path.display(),
                    archive_path.display()
                );
            }
        }
    }

    debug!(
        "Extracted {} files from {} into {}",
        files,
        archive_path.display(),
        dest_dir.display()
    );
    Ok(files)
}
