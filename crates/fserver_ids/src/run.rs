use crate::{validate_segment, IdParseError};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const RUN_PREFIX: &str = "run-";
pub const RUN_BUNDLE_EXTENSION: &str = ".frp";

/// Run identity: the text between `run-` and `.frp` in the uploaded
/// bundle name, e.g. `2016-02-16_12-21-00-Functional.bc-timdesk:bbb`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Result<Self, IdParseError> {
        let id = id.into();
        validate_segment("run id", &id)?;
        Ok(Self(id))
    }

    /// Derive the run id from an uploaded bundle name (`run-<id>.frp`).
    pub fn from_bundle_name(filename: &str) -> Result<Self, IdParseError> {
        let id = filename
            .strip_prefix(RUN_PREFIX)
            .and_then(|rest| rest.strip_suffix(RUN_BUNDLE_EXTENSION))
            .ok_or_else(|| {
                IdParseError::new(format!(
                    "Invalid filename for run: '{}' (expected run-<id>.frp)",
                    filename
                ))
            })?;
        Self::new(id)
    }

    /// Parse a run reference as a client would send it back: the record
    /// file name (`run-<id>.json`), the bundle name (`run-<id>.frp`), the
    /// record stem (`run-<id>`) or the bare id.
    pub fn parse(value: &str) -> Result<Self, IdParseError> {
        let value = value
            .strip_suffix(".json")
            .or_else(|| value.strip_suffix(RUN_BUNDLE_EXTENSION))
            .unwrap_or(value);
        let id = value.strip_prefix(RUN_PREFIX).unwrap_or(value);
        Self::new(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stem of the manifest record: `run-<id>`.
    pub fn record_stem(&self) -> String {
        format!("{}{}", RUN_PREFIX, self.0)
    }

    /// Name of the uploaded archive: `run-<id>.frp`.
    pub fn bundle_name(&self) -> String {
        format!("{}{}{}", RUN_PREFIX, self.0, RUN_BUNDLE_EXTENSION)
    }

    /// Name of the expanded artifact directory: `run-<id>`.
    pub fn artifact_dir_name(&self) -> String {
        self.record_stem()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
