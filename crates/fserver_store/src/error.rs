//! Error types for the record store and the components built on it.

use crate::lock::LockError;
use crate::removal::RemovalReport;
use fserver_ids::IdParseError;
use thiserror::Error;

/// Store operation result type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Missing, malformed or disallowed input from the client
    #[error("{0}")]
    BadRequest(String),

    /// A record or uploaded file with this name already exists
    #[error("{0}")]
    AlreadyExists(String),

    /// Record or artifact not found
    #[error("{0}")]
    NotFound(String),

    /// Request for a board that is not registered
    #[error("Board {board} is not registered")]
    AdmissionDenied { board: String },

    /// Bundle could not be unpacked or lacks its manifest
    #[error("{0}")]
    ExtractionFailed(String),

    /// Some removal steps failed; the report lists each step
    #[error("Removal incomplete\n{0}")]
    PartialFailure(RemovalReport),

    /// IO error (file system operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON record could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML manifest could not be decoded
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Server configuration could not be read or written
    #[error("Config error: {0}")]
    Config(String),

    /// Record lock could not be taken
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Coarse classification of a [`StoreError`], used by the action layer to
/// pick an outcome without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    AlreadyExists,
    NotFound,
    AdmissionDenied,
    ExtractionFailed,
    PartialFailure,
    Internal,
}

impl StoreError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn extraction_failed(msg: impl Into<String>) -> Self {
        Self::ExtractionFailed(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::BadRequest(_) => ErrorKind::BadRequest,
            StoreError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::AdmissionDenied { .. } => ErrorKind::AdmissionDenied,
            StoreError::ExtractionFailed(_) => ErrorKind::ExtractionFailed,
            StoreError::PartialFailure(_) => ErrorKind::PartialFailure,
            StoreError::Io(_)
            | StoreError::Json(_)
            | StoreError::Yaml(_)
            | StoreError::Config(_)
            | StoreError::Lock(_) => ErrorKind::Internal,
        }
    }
}

impl From<IdParseError> for StoreError {
    fn from(err: IdParseError) -> Self {
        StoreError::BadRequest(err.message().to_string())
    }
}
