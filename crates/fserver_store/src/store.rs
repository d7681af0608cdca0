//! Record Store - one file per record
//!
//! Every record kind lives in its own collection directory under the data
//! root. A record's file name is its index entry; there is no other
//! catalog.
//!
//! # Storage Format
//!
//! ```text
//! <data_dir>/
//! ├── requests/request-<timestamp>-<host>:<board>.json
//! ├── boards/<host>:<board>.json
//! ├── runs/run-<id>.json           (link into files/runs/run-<id>/run.json)
//! ├── tests/<name>-<version>-<release>.yaml
//! └── binary-packages/<toolchain>-<Type>.<name>.json
//! ```
//!
//! JSON records are written with sorted keys, four-space indentation and a
//! trailing newline, through a temp file and a rename. Readers therefore
//! never observe a half-written record.

use crate::error::{Result, StoreError};
use crate::lock::{self, RecordLockGuard};
use fserver_ids::is_safe_segment;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Record kinds, one directory each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Requests,
    Runs,
    Boards,
    Tests,
    BinaryPackages,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Requests,
        Collection::Runs,
        Collection::Boards,
        Collection::Tests,
        Collection::BinaryPackages,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Collection::Requests => "requests",
            Collection::Runs => "runs",
            Collection::Boards => "boards",
            Collection::Tests => "tests",
            Collection::BinaryPackages => "binary-packages",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Collection::Tests => "yaml",
            _ => "json",
        }
    }

    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.extension())
    }

    /// Strip this collection's extension from a file name, if present.
    pub fn stem_of<'a>(&self, name: &'a str) -> &'a str {
        name.strip_suffix(self.extension())
            .and_then(|s| s.strip_suffix('.'))
            .unwrap_or(name)
    }
}

/// What [`RecordStore::update`] should do after the closure ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Write,
    Skip,
}

/// Persistent record store rooted at the server's data directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    /// Open a store, creating any missing collection directories.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for collection in Collection::ALL {
            let dir = root.join(collection.dir_name());
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collection_dir(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.dir_name())
    }

    pub fn record_path(&self, collection: Collection, stem: &str) -> Result<PathBuf> {
        check_stem(stem)?;
        Ok(self
            .collection_dir(collection)
            .join(collection.file_name(stem)))
    }

    /// True if a record file (or link, even a dangling one) exists.
    pub fn contains(&self, collection: Collection, stem: &str) -> bool {
        self.record_path(collection, stem)
            .map(|path| path_exists(&path))
            .unwrap_or(false)
    }

    /// Take the exclusive lock for one record.
    pub fn lock(&self, collection: Collection, stem: &str) -> Result<RecordLockGuard> {
        check_stem(stem)?;
        Ok(lock::lock_exclusive(
            &self.collection_dir(collection),
            stem,
        )?)
    }

    /// Write a new record. Fails with `AlreadyExists` if the name is taken.
    pub fn create<T: Serialize>(
        &self,
        collection: Collection,
        stem: &str,
        record: &T,
    ) -> Result<PathBuf> {
        let path = self.record_path(collection, stem)?;
        let bytes = encode_record(record)?;

        let _guard = self.lock(collection, stem)?;
        if path_exists(&path) {
            return Err(StoreError::already_exists(format!(
                "Record {} already exists",
                collection.file_name(stem)
            )));
        }
        atomic_write(&path, &bytes)?;

        debug!("Created record {}", path.display());
        Ok(path)
    }

    /// Write a record, replacing any previous version.
    pub fn replace<T: Serialize>(
        &self,
        collection: Collection,
        stem: &str,
        record: &T,
    ) -> Result<PathBuf> {
        let path = self.record_path(collection, stem)?;
        let bytes = encode_record(record)?;

        let _guard = self.lock(collection, stem)?;
        atomic_write(&path, &bytes)?;

        debug!("Wrote record {}", path.display());
        Ok(path)
    }

    /// Read, modify and write back a record under its lock.
    ///
    /// The closure may veto the write by returning an error or
    /// [`Mutation::Skip`]; either way the stored record is unchanged.
    /// Returns the record as it stands after the call.
    pub fn update<T, F>(&self, collection: Collection, stem: &str, apply: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Result<Mutation>,
    {
        let path = self.record_path(collection, stem)?;

        let _guard = self.lock(collection, stem)?;
        let mut record: T = self.load(collection, stem)?;
        if apply(&mut record)? == Mutation::Write {
            atomic_write(&path, &encode_record(&record)?)?;
            debug!("Updated record {}", path.display());
        }
        Ok(record)
    }

    /// Load and decode a record. YAML collections are decoded as YAML.
    pub fn load<T: DeserializeOwned>(&self, collection: Collection, stem: &str) -> Result<T> {
        let text = self.load_text(collection, stem)?;
        let record = match collection {
            Collection::Tests => serde_yaml::from_str(&text)?,
            _ => serde_json::from_str(&text)?,
        };
        Ok(record)
    }

    pub fn load_value(&self, collection: Collection, stem: &str) -> Result<Value> {
        self.load(collection, stem)
    }

    /// Raw record text, following links.
    pub fn load_text(&self, collection: Collection, stem: &str) -> Result<String> {
        let path = self.record_path(collection, stem)?;
        fs::read_to_string(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StoreError::not_found(format!("No record {}", collection.file_name(stem)))
            } else {
                StoreError::Io(e)
            }
        })
    }

    /// Record stems in a collection, sorted. Hidden files are skipped.
    pub fn list(&self, collection: Collection) -> Result<Vec<String>> {
        let dir = self.collection_dir(collection);
        let suffix = format!(".{}", collection.extension());
        let mut stems = Vec::new();

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if let Some(stem) = name.strip_suffix(&suffix) {
                stems.push(stem.to_string());
            }
        }

        stems.sort();
        debug!("Listed {} records in {}", stems.len(), dir.display());
        Ok(stems)
    }

    /// Delete a record (or its link). `NotFound` if it does not exist.
    ///
    /// The record's lock file under `.locks/` is left in place; another
    /// process may be waiting on it. Stale lock files are harmless and can
    /// be deleted while no server process is running.
    pub fn delete(&self, collection: Collection, stem: &str) -> Result<()> {
        let path = self.record_path(collection, stem)?;

        let _guard = self.lock(collection, stem)?;
        fs::remove_file(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StoreError::not_found(format!("No record {}", collection.file_name(stem)))
            } else {
                StoreError::Io(e)
            }
        })?;

        debug!("Deleted record {}", path.display());
        Ok(())
    }

    /// Move an already-written file into place as a new record. The source
    /// must live on the same filesystem as the collection.
    pub fn adopt(&self, collection: Collection, stem: &str, source: &Path) -> Result<PathBuf> {
        let path = self.record_path(collection, stem)?;

        let _guard = self.lock(collection, stem)?;
        if path_exists(&path) {
            return Err(StoreError::already_exists(format!(
                "Record {} already exists",
                collection.file_name(stem)
            )));
        }
        fs::rename(source, &path)?;

        debug!("Adopted {} as {}", source.display(), path.display());
        Ok(path)
    }

    /// Create a record that is a link to a file stored elsewhere.
    pub fn link(&self, collection: Collection, stem: &str, target: &Path) -> Result<PathBuf> {
        let path = self.record_path(collection, stem)?;
        let target = fs::canonicalize(target)?;

        let _guard = self.lock(collection, stem)?;
        if path_exists(&path) {
            return Err(StoreError::already_exists(format!(
                "Record {} already exists",
                collection.file_name(stem)
            )));
        }
        make_link(&target, &path)?;

        debug!("Linked {} -> {}", path.display(), target.display());
        Ok(path)
    }
}

/// Encode a record as sorted, four-space indented JSON plus a newline.
pub fn encode_record<T: Serialize + ?Sized>(record: &T) -> Result<Vec<u8>> {
    // serde_json::Map is a BTreeMap, so going through Value sorts keys.
    let value = serde_json::to_value(record)?;
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

fn check_stem(stem: &str) -> Result<()> {
    if is_safe_segment(stem) {
        Ok(())
    } else {
        Err(StoreError::bad_request(format!(
            "Invalid record name '{}'",
            stem
        )))
    }
}

fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Atomic write via temp file + rename
fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = parent.join(format!(".tmp_{}", uuid::Uuid::new_v4()));
    fs::write(&temp_path, content)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(unix)]
fn make_link(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn make_link(target: &Path, link: &Path) -> io::Result<()> {
    fs::hard_link(target, link)
}
