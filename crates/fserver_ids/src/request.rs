use crate::{BoardId, IdParseError, Timestamp, TIMESTAMP_LEN};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const REQUEST_PREFIX: &str = "request-";

const TIMESTAMP_START: usize = REQUEST_PREFIX.len();
const TIMESTAMP_END: usize = TIMESTAMP_START + TIMESTAMP_LEN;
/// `request-` + timestamp + `-`; the `host:board` part starts here.
const BOARD_START: usize = TIMESTAMP_END + 1;

/// Request identity: `request-<timestamp>-<host>:<board>`.
///
/// Unique by construction as long as two requests for the same board are
/// not created within the same centisecond; the store rejects the second
/// one if they are.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId {
    timestamp: Timestamp,
    board: BoardId,
}

impl RequestId {
    pub fn new(timestamp: Timestamp, board: BoardId) -> Self {
        Self { timestamp, board }
    }

    /// Parse a request id. A trailing `.json` (the record file name) is
    /// accepted and ignored.
    pub fn parse(value: &str) -> Result<Self, IdParseError> {
        let value = value.strip_suffix(".json").unwrap_or(value);
        let invalid = || IdParseError::new(format!("Invalid request id: '{}'", value));

        if !value.starts_with(REQUEST_PREFIX) || value.len() <= BOARD_START {
            return Err(invalid());
        }
        let timestamp = value
            .get(TIMESTAMP_START..TIMESTAMP_END)
            .ok_or_else(invalid)
            .and_then(|raw| Timestamp::parse(raw).map_err(|_| invalid()))?;
        if value.get(TIMESTAMP_END..BOARD_START) != Some("-") {
            return Err(invalid());
        }
        let board = value
            .get(BOARD_START..)
            .ok_or_else(invalid)
            .and_then(|raw| BoardId::parse(raw).map_err(|_| invalid()))?;

        Ok(Self { timestamp, board })
    }

    /// Extract only the `host:board` suffix from a record stem, without
    /// validating the timestamp. Used by the filename stage of queries.
    pub fn board_suffix(stem: &str) -> Option<&str> {
        if !stem.starts_with(REQUEST_PREFIX) {
            return None;
        }
        stem.get(BOARD_START..).filter(|rest| !rest.is_empty())
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    pub fn board(&self) -> &BoardId {
        &self.board
    }

    pub fn stem(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}-{}", REQUEST_PREFIX, self.timestamp, self.board)
    }
}

impl std::str::FromStr for RequestId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
