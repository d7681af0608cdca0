use crate::{validate_segment, IdParseError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A registered target, identified by `host:board`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BoardId {
    host: String,
    board: String,
}

impl BoardId {
    pub fn new(host: impl Into<String>, board: impl Into<String>) -> Result<Self, IdParseError> {
        let host = host.into();
        let board = board.into();
        validate_segment("host", &host)?;
        validate_segment("board", &board)?;
        if host.contains(':') {
            return Err(IdParseError::new(format!(
                "Invalid host '{}': must not contain ':'",
                host
            )));
        }
        Ok(Self { host, board })
    }

    /// Parse `host:board`. The host ends at the first `:`.
    pub fn parse(value: &str) -> Result<Self, IdParseError> {
        let (host, board) = value.split_once(':').ok_or_else(|| {
            IdParseError::new(format!("Invalid board id '{}': expected host:board", value))
        })?;
        Self::new(host, board)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn board(&self) -> &str {
        &self.board
    }

    /// Record file stem, identical to the display form.
    pub fn stem(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.board)
    }
}

impl std::str::FromStr for BoardId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
