//! Remote directory layout.
//!
//! ```text
//! remote:root/<folder>/current/                 mirror of the local source
//! remote:root/<folder>/.changed/<stamp>/...     pre-overwrite versions
//! remote:root/<folder>/.deleted/<stamp>/...     files removed locally
//! ```

use crate::stamp::VersionStamp;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CURRENT_DIR: &str = "current";

/// A path on a configured remote, rendered as `remote:path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemotePath {
    pub remote: String,
    pub path: String,
}

impl RemotePath {
    pub fn new(remote: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            path: trim_slashes(&path.into()).to_string(),
        }
    }

    /// Append a relative path using `/` separators regardless of platform.
    pub fn join(&self, relative: &str) -> Self {
        let relative = trim_slashes(relative);
        let path = match (self.path.is_empty(), relative.is_empty()) {
            (_, true) => self.path.clone(),
            (true, false) => relative.to_string(),
            (false, false) => format!("{}/{}", self.path, relative),
        };
        Self {
            remote: self.remote.clone(),
            path,
        }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.remote, self.path)
    }
}

fn trim_slashes(s: &str) -> &str {
    s.trim_matches('/')
}

/// Archive bucket beside `current/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Changed,
    Deleted,
}

impl Bucket {
    pub fn dir_name(self) -> &'static str {
        match self {
            Bucket::Changed => ".changed",
            Bucket::Deleted => ".deleted",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Remote name plus the root folder every source lives under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    pub remote: String,
    pub root: String,
}

impl RemoteLayout {
    pub fn new(remote: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            root: root.into(),
        }
    }

    pub fn folder(&self, folder: &str) -> FolderLayout {
        FolderLayout {
            base: RemotePath::new(&self.remote, self.root.as_str()).join(folder),
        }
    }
}

/// Layout of a single source's folder on the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLayout {
    base: RemotePath,
}

impl FolderLayout {
    pub fn base(&self) -> &RemotePath {
        &self.base
    }

    pub fn current(&self) -> RemotePath {
        self.base.join(CURRENT_DIR)
    }

    pub fn bucket(&self, bucket: Bucket) -> RemotePath {
        self.base.join(bucket.dir_name())
    }

    pub fn version_dir(&self, bucket: Bucket, stamp: &VersionStamp) -> RemotePath {
        self.bucket(bucket).join(stamp.as_str())
    }
}
