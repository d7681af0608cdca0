//! Action envelope.
//!
//! The HTTP collaborator turns a form post into an [`ActionRequest`] and
//! writes the rendered [`ActionResponse`] back to the client.
//!
//! # Supported Actions
//!
//! - `put_test` / `put_binary_package` / `put_run` (with an uploaded bundle)
//! - `put_board` / `put_request` / `update_request`
//! - `query_boards` / `query_requests` / `query_runs` / `query_tests` /
//!   `query_binary_packages`
//! - `get_request` / `get_run` / `get_run_url` / `get_test`
//! - `remove_request` / `remove_run`
//! - `show` (HTML)

use fserver_store::{ErrorKind, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    PutTest,
    PutBinaryPackage,
    PutRun,
    PutBoard,
    PutRequest,
    UpdateRequest,
    QueryBoards,
    QueryRequests,
    QueryRuns,
    QueryTests,
    QueryBinaryPackages,
    GetRequest,
    GetRun,
    GetRunUrl,
    GetTest,
    RemoveRequest,
    RemoveRun,
    Show,
}

impl Action {
    pub const ALL: [Action; 18] = [
        Action::PutTest,
        Action::PutBinaryPackage,
        Action::PutRun,
        Action::PutBoard,
        Action::PutRequest,
        Action::UpdateRequest,
        Action::QueryBoards,
        Action::QueryRequests,
        Action::QueryRuns,
        Action::QueryTests,
        Action::QueryBinaryPackages,
        Action::GetRequest,
        Action::GetRun,
        Action::GetRunUrl,
        Action::GetTest,
        Action::RemoveRequest,
        Action::RemoveRun,
        Action::Show,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::PutTest => "put_test",
            Action::PutBinaryPackage => "put_binary_package",
            Action::PutRun => "put_run",
            Action::PutBoard => "put_board",
            Action::PutRequest => "put_request",
            Action::UpdateRequest => "update_request",
            Action::QueryBoards => "query_boards",
            Action::QueryRequests => "query_requests",
            Action::QueryRuns => "query_runs",
            Action::QueryTests => "query_tests",
            Action::QueryBinaryPackages => "query_binary_packages",
            Action::GetRequest => "get_request",
            Action::GetRun => "get_run",
            Action::GetRunUrl => "get_run_url",
            Action::GetTest => "get_test",
            Action::RemoveRequest => "remove_request",
            Action::RemoveRun => "remove_run",
            Action::Show => "show",
        }
    }

    /// Parse an action name. An empty name means `show`.
    pub fn parse(name: &str) -> Result<Self, StoreError> {
        if name.is_empty() {
            return Ok(Action::Show);
        }
        Action::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == name)
            .ok_or_else(|| StoreError::bad_request(format!("Unknown action '{}'", name)))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An uploaded file as handed over by the HTTP layer.
pub struct UploadedFile {
    pub filename: String,
    pub body: Box<dyn Read + Send>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, body: impl Read + Send + 'static) -> Self {
        Self {
            filename: filename.into(),
            body: Box::new(body),
        }
    }

    /// Open a local file, using its base name as the client filename.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} has no usable file name", path.display()),
                )
            })?
            .to_string();
        Ok(Self::new(filename, File::open(path)?))
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("filename", &self.filename)
            .finish()
    }
}

/// One inbound call.
#[derive(Debug, Default)]
pub struct ActionRequest {
    pub action: String,
    pub fields: BTreeMap<String, String>,
    pub upload: Option<UploadedFile>,
    /// Page name for `show` (the last path segment of the URL).
    pub page: Option<String>,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    /// Build from raw form fields; the `action` field selects the action.
    pub fn from_fields(mut fields: BTreeMap<String, String>) -> Self {
        let action = fields.remove("action").unwrap_or_default();
        Self {
            action,
            fields,
            ..Self::default()
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn upload(mut self, upload: UploadedFile) -> Self {
        self.upload = Some(upload);
        self
    }

    pub fn page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAIL")]
    Fail,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ok => write!(f, "OK"),
            Outcome::Fail => write!(f, "FAIL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Text,
    Html,
}

impl ContentType {
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Text => "text/plain",
            ContentType::Html => "text/html",
        }
    }
}

/// Result of one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub outcome: Outcome,
    pub body: String,
    pub content_type: ContentType,
    #[serde(skip)]
    pub error_kind: Option<ErrorKind>,
}

impl ActionResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Ok,
            body: body.into(),
            content_type: ContentType::Text,
            error_kind: None,
        }
    }

    pub fn fail(err: &StoreError) -> Self {
        Self {
            outcome: Outcome::Fail,
            body: err.to_string(),
            content_type: ContentType::Text,
            error_kind: Some(err.kind()),
        }
    }

    pub fn html(outcome: Outcome, body: String) -> Self {
        Self {
            outcome,
            body,
            content_type: ContentType::Html,
            error_kind: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome == Outcome::Ok
    }

    /// Wire form: `OK|FAIL`, newline, body for text; the page for HTML.
    pub fn render(&self) -> String {
        match self.content_type {
            ContentType::Text => format!("{}\n{}", self.outcome, self.body),
            ContentType::Html => self.body.clone(),
        }
    }
}
