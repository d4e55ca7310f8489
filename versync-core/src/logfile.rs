//! Per-run transfer log files.
//!
//! The sync tool writes one log per source per run, named
//! `<stamp>_backup.log` or `<stamp>_restore.log`. The status report reads
//! them back to find the last run and whether it logged an error.

use crate::stamp::VersionStamp;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Any log line containing this marks the run as failed.
pub const ERROR_MARKER: &str = "ERROR";

const SUMMARY_KEYWORDS: [&str; 4] = ["Transferred", "Checks", "Elapsed", "Errors"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    Backup,
    Restore,
}

impl RunKind {
    fn suffix(self) -> &'static str {
        match self {
            RunKind::Backup => "_backup.log",
            RunKind::Restore => "_restore.log",
        }
    }
}

pub fn log_file_name(kind: RunKind, stamp: &VersionStamp) -> String {
    format!("{}{}", stamp, kind.suffix())
}

pub fn log_path(dir: &Path, kind: RunKind, stamp: &VersionStamp) -> PathBuf {
    dir.join(log_file_name(kind, stamp))
}

/// Stamp of a log file name of the given kind, if it is one.
pub fn parse_log_name(name: &str, kind: RunKind) -> Option<VersionStamp> {
    name.strip_suffix(kind.suffix())
        .and_then(|stamp| VersionStamp::parse(stamp).ok())
}

pub fn has_errors(content: &str) -> bool {
    content.contains(ERROR_MARKER)
}

/// Statistics lines worth echoing after a transfer.
pub fn transfer_summary(content: &str) -> Vec<&str> {
    content
        .lines()
        .filter(|line| SUMMARY_KEYWORDS.iter().any(|kw| line.contains(kw)))
        .map(str::trim_end)
        .collect()
}

/// Read a log and return its summary lines; an unreadable log has none.
pub async fn read_summary(path: &Path) -> Vec<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => transfer_summary(&content)
            .into_iter()
            .map(str::to_string)
            .collect(),
        Err(_) => Vec::new(),
    }
}
