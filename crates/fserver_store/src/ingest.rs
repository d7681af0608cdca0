//! Bundle ingestion pipeline.
//!
//! Every upload first passes the [`UploadAcceptor`], which refuses to
//! overwrite an existing file. The bundle is then unpacked into a private
//! staging directory and its manifest moved (or linked) into the record
//! store. Staging directories are removed on every path.

use crate::archive;
use crate::error::{Result, StoreError};
use crate::store::{Collection, RecordStore};
use fserver_ids::{
    validate_segment, BinaryPackageId, RunId, TestPackageId, BINARY_MANIFEST_NAME,
};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Upload bodies are copied in chunks of this size.
pub const UPLOAD_CHUNK_SIZE: usize = 100_000;

/// Name of the directory, inside a run bundle, that becomes the artifact tree.
const RUN_BUNDLE_DIR: &str = "run";
const RUN_MANIFEST_NAME: &str = "run.json";

/// Upload sub-directories under the files tree.
pub const TEST_UPLOAD_DIR: &str = "tests";
pub const RUN_UPLOAD_DIR: &str = "runs";
pub const BINARY_UPLOAD_DIR: &str = "binary-packages";

/// A client-supplied file: its name and a stream over its body.
pub struct Upload<R> {
    pub filename: String,
    pub body: R,
}

impl<R: Read> Upload<R> {
    pub fn new(filename: impl Into<String>, body: R) -> Self {
        Self {
            filename: filename.into(),
            body,
        }
    }
}

/// Streams uploads into one directory, never overwriting.
#[derive(Debug, Clone)]
pub struct UploadAcceptor {
    dir: PathBuf,
}

impl UploadAcceptor {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the upload to `<dir>/<filename>`. `AlreadyExists` if that file
    /// is already present; a partially written file is removed on error.
    pub fn accept<R: Read>(&self, upload: Upload<R>) -> Result<PathBuf> {
        let Upload { filename, mut body } = upload;
        validate_segment("upload filename", &filename)?;
        fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(&filename);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!("Refusing upload over existing {}", path.display());
                return Err(StoreError::already_exists(format!(
                    "Already have a file {}. Cannot proceed.",
                    filename
                )));
            }
            Err(e) => return Err(e.into()),
        };

        match copy_chunked(&mut body, &mut file) {
            Ok(bytes) => {
                info!("Received upload {} ({} bytes)", path.display(), bytes);
                Ok(path)
            }
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&path);
                Err(e.into())
            }
        }
    }
}

fn copy_chunked<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> io::Result<u64> {
    let mut buf = vec![0u8; UPLOAD_CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    writer.flush()?;
    Ok(total)
}

/// Outcome of one successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub archive: PathBuf,
    pub record: PathBuf,
    pub artifacts: Option<PathBuf>,
    pub messages: Vec<String>,
}

impl IngestReport {
    fn new(archive: PathBuf, record: PathBuf) -> Self {
        let messages = vec![
            format!("Stored bundle {}", archive.display()),
            format!("Stored manifest {}", record.display()),
        ];
        Self {
            archive,
            record,
            artifacts: None,
            messages,
        }
    }

    pub fn summary(&self) -> String {
        self.messages.join("\n")
    }
}

#[derive(Debug, Clone)]
pub struct BundleIngestor {
    store: RecordStore,
    files_dir: PathBuf,
}

impl BundleIngestor {
    pub fn new(store: RecordStore, files_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            files_dir: files_dir.into(),
        }
    }

    fn acceptor(&self, sub_dir: &str) -> UploadAcceptor {
        UploadAcceptor::new(self.files_dir.join(sub_dir))
    }

    /// Store the upload, then run `check`; the stored file is removed
    /// again if the check fails. A repeated bundle name is refused by the
    /// acceptor before any record is consulted.
    fn accept_checked<R, F>(&self, sub_dir: &str, upload: Upload<R>, check: F) -> Result<PathBuf>
    where
        R: Read,
        F: FnOnce() -> Result<()>,
    {
        let archive = self.acceptor(sub_dir).accept(upload)?;
        if let Err(e) = check() {
            if let Err(cleanup) = fs::remove_file(&archive) {
                warn!("Failed to remove {}: {}", archive.display(), cleanup);
            }
            return Err(e);
        }
        Ok(archive)
    }

    /// Ingest a `.ftp` test package; stores `<name>/test.yaml` as
    /// `tests/<stem>.yaml`.
    pub fn ingest_test<R: Read>(&self, upload: Upload<R>) -> Result<IngestReport> {
        let id = TestPackageId::from_bundle_name(&upload.filename)?;
        let archive = self.accept_checked(TEST_UPLOAD_DIR, upload, || {
            ensure_absent(&self.store, Collection::Tests, id.stem())
        })?;
        let staging = staging_dir(&self.store.collection_dir(Collection::Tests))?;

        let member = PathBuf::from(id.manifest_member());
        let manifest = archive::extract_member(&archive, staging.path(), |p| p == member)?
            .ok_or_else(|| {
                StoreError::extraction_failed(format!(
                    "Can't find {} in {} after extraction",
                    member.display(),
                    archive.display()
                ))
            })?;

        let text = fs::read_to_string(&manifest)?;
        serde_yaml::from_str::<serde_yaml::Value>(&text).map_err(|e| {
            StoreError::extraction_failed(format!("Invalid {}: {}", member.display(), e))
        })?;

        let record = self.store.adopt(Collection::Tests, id.stem(), &manifest)?;
        info!("Ingested test package {}", id);
        Ok(IngestReport::new(archive, record))
    }

    /// Ingest a `.ftbp` binary package; stores `binary-package.json` as
    /// `binary-packages/<toolchain>-<Type>.<name>.json`.
    pub fn ingest_binary_package<R: Read>(&self, upload: Upload<R>) -> Result<IngestReport> {
        let id = BinaryPackageId::from_bundle_name(&upload.filename)?;
        let stem = id.stem();
        let archive = self.accept_checked(BINARY_UPLOAD_DIR, upload, || {
            ensure_absent(&self.store, Collection::BinaryPackages, &stem)
        })?;
        let staging = staging_dir(&self.store.collection_dir(Collection::BinaryPackages))?;

        let manifest = archive::extract_member(&archive, staging.path(), |p| {
            p.components().count() <= 2
                && p.file_name().and_then(|n| n.to_str()) == Some(BINARY_MANIFEST_NAME)
        })?
        .ok_or_else(|| {
            StoreError::extraction_failed(format!(
                "Can't find {} in {} after extraction",
                BINARY_MANIFEST_NAME,
                archive.display()
            ))
        })?;
        require_json_object(&manifest, BINARY_MANIFEST_NAME)?;

        let record = self
            .store
            .adopt(Collection::BinaryPackages, &stem, &manifest)?;
        info!("Ingested binary package {}", id);
        Ok(IngestReport::new(archive, record))
    }

    /// Ingest a `.frp` run bundle. The bundle's `run/` directory becomes
    /// `files/runs/run-<id>/` and `runs/run-<id>.json` links to its
    /// `run.json`.
    pub fn ingest_run<R: Read>(&self, upload: Upload<R>) -> Result<IngestReport> {
        let id = RunId::from_bundle_name(&upload.filename)?;
        let runs_dir = self.files_dir.join(RUN_UPLOAD_DIR);
        let target = runs_dir.join(id.artifact_dir_name());
        let archive = self.accept_checked(RUN_UPLOAD_DIR, upload, || {
            ensure_absent(&self.store, Collection::Runs, &id.record_stem())?;
            if target.exists() {
                return Err(StoreError::already_exists(format!(
                    "Run directory {} already exists",
                    target.display()
                )));
            }
            Ok(())
        })?;
        let staging = staging_dir(&runs_dir)?;
        archive::extract_all(&archive, staging.path())?;

        let extracted = staging.path().join(RUN_BUNDLE_DIR);
        let manifest = extracted.join(RUN_MANIFEST_NAME);
        if !manifest.is_file() {
            return Err(StoreError::extraction_failed(format!(
                "Missing {}/{} in {}",
                RUN_BUNDLE_DIR,
                RUN_MANIFEST_NAME,
                archive.display()
            )));
        }
        require_json_object(&manifest, RUN_MANIFEST_NAME)?;

        fs::rename(&extracted, &target)?;
        debug!("Moved run artifacts to {}", target.display());

        let record = self.store.link(
            Collection::Runs,
            &id.record_stem(),
            &target.join(RUN_MANIFEST_NAME),
        )?;
        info!("Ingested run {}", id);

        let mut report = IngestReport::new(archive, record);
        report
            .messages
            .push(format!("Stored run artifacts {}", target.display()));
        report.artifacts = Some(target);
        Ok(report)
    }
}

fn ensure_absent(store: &RecordStore, collection: Collection, stem: &str) -> Result<()> {
    if store.contains(collection, stem) {
        return Err(StoreError::already_exists(format!(
            "Record {} already exists",
            collection.file_name(stem)
        )));
    }
    Ok(())
}

/// Hidden staging directory on the same filesystem as its final home.
fn staging_dir(parent: &Path) -> Result<tempfile::TempDir> {
    fs::create_dir_all(parent)?;
    Ok(tempfile::Builder::new()
        .prefix(".ingest-")
        .tempdir_in(parent)?)
}

fn require_json_object(path: &Path, label: &str) -> Result<()> {
    let text = fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(_)) => Ok(()),
        Ok(_) => Err(StoreError::extraction_failed(format!(
            "Invalid {}: expected a JSON object",
            label
        ))),
        Err(e) => Err(StoreError::extraction_failed(format!(
            "Invalid {}: {}",
            label, e
        ))),
    }
}
