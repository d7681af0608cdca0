//! Per-record locking.
//!
//! Every read-modify-write of a record happens under an exclusive lock on
//! a sidecar file in `<collection>/.locks/`. Locks are advisory and shared
//! across processes, so concurrent CGI invocations serialize on the same
//! record while different records proceed independently.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Directory, inside each collection, that holds lock files.
pub const LOCK_DIR_NAME: &str = ".locks";

/// Errors from lock operations.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Failed to create lock file {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to acquire lock {path}: {source}")]
    AcquireFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A guard that holds an exclusive lock on one record.
///
/// The lock is released when the guard is dropped. The lock file itself
/// stays behind; removing it would let a waiter lock an unlinked inode.
pub struct RecordLockGuard {
    _file: File,
    lock_path: PathBuf,
}

impl RecordLockGuard {
    /// Get the path to the lock file.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for RecordLockGuard {
    fn drop(&mut self) {
        debug!("Releasing record lock: {}", self.lock_path.display());
        // Closing the file releases the flock/LockFileEx lock.
    }
}

impl std::fmt::Debug for RecordLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordLockGuard")
            .field("lock_path", &self.lock_path)
            .finish()
    }
}

/// Lock file path for a record stem inside a collection directory.
///
/// Examples:
/// - `data/requests`, `request-x` -> `data/requests/.locks/request-x.lock`
///
/// Lock files outlive their records; see [`crate::RecordStore::delete`].
pub fn lock_path_for(collection_dir: &Path, stem: &str) -> PathBuf {
    collection_dir
        .join(LOCK_DIR_NAME)
        .join(format!("{}.lock", stem))
}

/// Acquire an exclusive lock on a record, waiting if necessary.
pub fn lock_exclusive(collection_dir: &Path, stem: &str) -> Result<RecordLockGuard, LockError> {
    let lock_path = lock_path_for(collection_dir, stem);

    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent).map_err(|source| LockError::CreateFailed {
            path: lock_path.clone(),
            source,
        })?;
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|source| LockError::CreateFailed {
            path: lock_path.clone(),
            source,
        })?;

    // Fully qualified: newer std has its own File::lock_exclusive.
    FileExt::lock_exclusive(&file).map_err(|source| LockError::AcquireFailed {
        path: lock_path.clone(),
        source,
    })?;

    debug!("Acquired record lock: {}", lock_path.display());
    Ok(RecordLockGuard {
        _file: file,
        lock_path,
    })
}
