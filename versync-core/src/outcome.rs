//! Per-source and per-run results shared by backup and restore.

use crate::archive::ArchiveReport;
use crate::classify::Classification;
use crate::retention::PruneReport;
use crate::stamp::VersionStamp;
use serde::Serialize;
use std::path::PathBuf;

/// Steps of a backup, in the only order they may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Classify,
    ArchiveChanged,
    ArchiveDeleted,
    Mirror,
    PruneChanged,
    PruneDeleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceResult {
    Success,
    /// The local directory was gone when its turn came.
    SourceMissing,
    /// Comparison could not run; nothing was archived or mirrored.
    ClassifyFailed { error: String },
    /// Mirror exited non-zero or could not be started (code 1).
    MirrorFailed { code: i32 },
}

impl SourceResult {
    pub fn exit_code(&self) -> i32 {
        match self {
            SourceResult::Success => 0,
            SourceResult::SourceMissing | SourceResult::ClassifyFailed { .. } => 1,
            SourceResult::MirrorFailed { code } => *code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SourceResult::Success)
    }

    pub(crate) fn from_mirror_code(code: i32) -> Self {
        if code == 0 {
            SourceResult::Success
        } else {
            SourceResult::MirrorFailed { code }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub folder: String,
    pub result: SourceResult,
    /// Steps that ran, in order.
    pub steps: Vec<Step>,
    pub classification: Option<Classification>,
    pub archives: Vec<ArchiveReport>,
    pub prunes: Vec<PruneReport>,
    pub log_file: Option<PathBuf>,
}

impl SourceOutcome {
    pub(crate) fn new(folder: &str) -> Self {
        Self {
            folder: folder.to_string(),
            result: SourceResult::Success,
            steps: Vec::new(),
            classification: None,
            archives: Vec::new(),
            prunes: Vec::new(),
            log_file: None,
        }
    }

    /// Paths whose previous version could not be archived before the mirror.
    pub fn lost_versions(&self) -> impl Iterator<Item = &str> {
        self.archives
            .iter()
            .flat_map(|a| a.failed.iter().map(|f| f.path.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub stamp: VersionStamp,
    pub dry_run: bool,
    pub sources: Vec<SourceOutcome>,
}

impl RunSummary {
    /// 0 if every source succeeded, else the first failing source's code.
    pub fn exit_code(&self) -> i32 {
        self.sources
            .iter()
            .map(|s| s.result.exit_code())
            .find(|code| *code != 0)
            .unwrap_or(0)
    }

    pub fn failed(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.sources.iter().filter(|s| !s.result.is_success())
    }
}
