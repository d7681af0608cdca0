use crate::IdParseError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of a formatted timestamp: `YYYY-MM-DD_HH:MM:SS.cc`.
pub const TIMESTAMP_LEN: usize = 22;

const SECONDS_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";
const PARSE_FORMAT: &str = "%Y-%m-%d_%H:%M:%S%.f";

/// Server timestamp with centisecond precision.
///
/// Fixed width, so lexicographic order of names that start with a
/// timestamp is also chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let centis = (at.timestamp_subsec_millis() / 10).min(99);
        Self(format!("{}.{:02}", at.format(SECONDS_FORMAT), centis))
    }

    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn parse(value: &str) -> Result<Self, IdParseError> {
        if value.len() != TIMESTAMP_LEN || parse_datetime(value).is_none() {
            return Err(IdParseError::new(format!("Invalid timestamp: '{}'", value)));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        parse_datetime(&self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a time value written by the server or by a test host.
///
/// Accepts the server format (fraction optional) and RFC 3339. Values
/// without a zone are taken as UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, PARSE_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}
