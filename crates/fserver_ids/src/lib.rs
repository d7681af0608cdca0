//! Identity types for Fuego server records.
//!
//! Every record the server keeps is a single file whose name *is* its
//! index entry. The types in this crate own the naming rules, so the
//! store and the query layer never slice filenames by hand.
//!
//! | Kind | Bundle name | Record stem |
//! |------|-------------|-------------|
//! | Board | - | `host:board` |
//! | Request | - | `request-<timestamp>-<host>:<board>` |
//! | Run | `run-<id>.frp` | `run-<id>` |
//! | Test package | `<name>-<version>-<release>.ftp` | `<name>-<version>-<release>` |
//! | Binary package | `<toolchain>-<Functional\|Benchmark>.<name>.ftbp` | same stem |

mod board;
mod package;
mod request;
mod run;
mod timestamp;

pub use board::BoardId;
pub use package::{
    BinaryPackageId, TestPackageId, TestType, BINARY_MANIFEST_NAME, TEST_MANIFEST_NAME,
};
pub use request::{RequestId, REQUEST_PREFIX};
pub use run::{RunId, RUN_BUNDLE_EXTENSION, RUN_PREFIX};
pub use timestamp::{parse_datetime, Timestamp, TIMESTAMP_LEN};

use std::fmt;

/// Error returned when a name does not follow its identity scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError {
    message: String,
}

impl IdParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdParseError {}

/// Returns true if `value` can be used verbatim as one path segment.
///
/// Names starting with `.` are reserved for the store's temporary and lock
/// files, so they are never valid identities.
pub fn is_safe_segment(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('.')
        && !value.chars().any(|c| matches!(c, '/' | '\\' | '\0'))
}

/// Validate a single path segment, naming the offending field on failure.
pub fn validate_segment(label: &str, value: &str) -> Result<(), IdParseError> {
    if value.is_empty() {
        return Err(IdParseError::new(format!("{} must not be empty", label)));
    }
    if !is_safe_segment(value) {
        return Err(IdParseError::new(format!(
            "Invalid {} '{}': must be a plain file name",
            label, value
        )));
    }
    Ok(())
}
