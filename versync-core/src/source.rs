//! Configured sources and the retention policy applied to their archives.

use crate::layout::Bucket;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_KEEP_CHANGED: usize = 5;
pub const DEFAULT_KEEP_DELETED: usize = 10;

/// A local directory mirrored to `<root>/<folder>/current`.
///
/// `folder` is the source's identity: two sources may not share it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub local_path: PathBuf,
    pub folder: String,
    /// Global patterns first, then the source's own.
    pub excludes: Vec<String>,
    /// Where per-run log files for this source are written.
    pub log_dir: PathBuf,
}

impl Source {
    pub fn new(local_path: impl Into<PathBuf>, folder: impl Into<String>) -> Self {
        let local_path = local_path.into();
        Self {
            log_dir: local_path.join("logs"),
            local_path,
            folder: folder.into(),
            excludes: Vec::new(),
        }
    }

    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub keep_changed: usize,
    pub keep_deleted: usize,
}

impl RetentionPolicy {
    pub fn keep_for(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Changed => self.keep_changed,
            Bucket::Deleted => self.keep_deleted,
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep_changed: DEFAULT_KEEP_CHANGED,
            keep_deleted: DEFAULT_KEEP_DELETED,
        }
    }
}
