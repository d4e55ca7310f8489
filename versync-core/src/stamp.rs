//! Version stamps naming the archive directories.
//!
//! Stamps are zero-padded `YYYY-MM-DD_HH-MM-SS` strings taken in UTC, so
//! sorting them as plain strings yields chronological order.

use crate::error::SyncError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionStamp(String);

impl VersionStamp {
    /// Stamp for the current instant.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.format(STAMP_FORMAT).to_string())
    }

    /// Parse a stamp, rejecting anything that would not sort chronologically
    /// (missing zero padding, trailing text, out-of-range fields).
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        let parsed = NaiveDateTime::parse_from_str(raw, STAMP_FORMAT)
            .map_err(|_| SyncError::InvalidStamp(raw.to_string()))?;
        if parsed.format(STAMP_FORMAT).to_string() != raw {
            return Err(SyncError::InvalidStamp(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_naive(&self) -> NaiveDateTime {
        // The inner string is only ever built by `from_datetime` or `parse`.
        NaiveDateTime::parse_from_str(&self.0, STAMP_FORMAT).unwrap_or_default()
    }
}

impl fmt::Display for VersionStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VersionStamp {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionStamp {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionStamp> for String {
    fn from(stamp: VersionStamp) -> Self {
        stamp.0
    }
}
