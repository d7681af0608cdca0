//! Run registry: queries, download URLs and removal of ingested runs.

use crate::error::{Result, StoreError};
use crate::ingest::RUN_UPLOAD_DIR;
use crate::query::{
    self, AttributeSchema, AttributeSource, Attributes, FirstMatchSchema, QueryParams,
};
use crate::removal::{RemovalReport, StepStatus};
use crate::store::{Collection, RecordStore};
use fserver_ids::{RunId, RUN_PREFIX};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Filename field a run query can match without opening records.
pub const RUN_NAME_FIELDS: [&str; 1] = ["run_id"];

/// Attributes of a run manifest: top-level scalars plus the `metadata`
/// object, flattened. Top-level fields win on a clash.
pub fn run_attributes(manifest: &Value) -> Attributes {
    let mut attrs = Attributes::new();
    let Value::Object(top) = manifest else {
        return attrs;
    };
    if let Some(Value::Object(metadata)) = top.get("metadata") {
        for (k, v) in metadata {
            attrs.insert(k.clone(), v.clone());
        }
    }
    for (k, v) in top {
        if !v.is_object() && !v.is_array() {
            attrs.insert(k.clone(), v.clone());
        }
    }
    attrs
}

struct RunAttributes<'a> {
    store: &'a RecordStore,
}

impl AttributeSource for RunAttributes<'_> {
    fn attributes(&self, stem: &str) -> Result<Attributes> {
        Ok(run_attributes(&self.store.load_value(Collection::Runs, stem)?))
    }
}

pub struct RunRegistry {
    store: RecordStore,
    files_dir: PathBuf,
    files_url_base: String,
    schema: Box<dyn AttributeSchema>,
}

impl RunRegistry {
    pub fn new(store: RecordStore, files_dir: impl Into<PathBuf>, files_url_base: &str) -> Self {
        Self {
            store,
            files_dir: files_dir.into(),
            files_url_base: files_url_base.trim_end_matches('/').to_string(),
            schema: Box::new(FirstMatchSchema),
        }
    }

    pub fn with_schema(mut self, schema: Box<dyn AttributeSchema>) -> Self {
        self.schema = schema;
        self
    }

    fn runs_dir(&self) -> PathBuf {
        self.files_dir.join(RUN_UPLOAD_DIR)
    }

    /// The run manifest.
    pub fn get(&self, id: &RunId) -> Result<Value> {
        self.store.load_value(Collection::Runs, &id.record_stem())
    }

    /// Record file names of matching runs.
    pub fn query(&self, params: &QueryParams) -> Result<Vec<String>> {
        let stems = self.store.list(Collection::Runs)?;
        let candidates = query::filter_by_name(stems, &RUN_NAME_FIELDS, params, |stem| {
            stem.strip_prefix(RUN_PREFIX).map(|id| vec![id.to_string()])
        });
        let source = RunAttributes { store: &self.store };
        let matched = query::filter_by_attributes(
            candidates,
            params,
            &RUN_NAME_FIELDS,
            self.schema.as_ref(),
            &source,
        )?;
        Ok(matched
            .iter()
            .map(|stem| Collection::Runs.file_name(stem))
            .collect())
    }

    /// Download URL of the run's bundle. `NotFound` if the bundle is gone.
    pub fn url(&self, id: &RunId) -> Result<String> {
        let archive = self.runs_dir().join(id.bundle_name());
        if !archive.is_file() {
            return Err(StoreError::not_found(format!(
                "No bundle for run {}",
                id
            )));
        }
        Ok(format!(
            "{}/{}/{}",
            self.files_url_base,
            RUN_UPLOAD_DIR,
            id.bundle_name()
        ))
    }

    /// Remove the manifest link, the bundle and the artifact tree. Each
    /// step is attempted even if an earlier one failed.
    pub fn remove(&self, id: &RunId) -> Result<RemovalReport> {
        let mut report = RemovalReport::new();
        let stem = id.record_stem();

        let manifest = self.store.record_path(Collection::Runs, &stem)?;
        report.attempt("run manifest", &manifest, |_| {
            match self.store.delete(Collection::Runs, &stem) {
                Ok(()) => StepStatus::Removed,
                Err(StoreError::NotFound(_)) => StepStatus::Missing,
                Err(e) => StepStatus::Failed(e.to_string()),
            }
        });

        let archive = self.runs_dir().join(id.bundle_name());
        report.attempt("run bundle", &archive, |path| {
            StepStatus::from_io(fs::remove_file(path))
        });

        let artifacts = self.runs_dir().join(id.artifact_dir_name());
        report.attempt("run directory", &artifacts, |path| {
            StepStatus::from_io(fs::remove_dir_all(path))
        });

        let report = report.into_result(&format!("Run {}", id))?;
        info!("Removed run {}", id);
        Ok(report)
    }
}
