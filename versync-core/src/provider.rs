//! The remote sync capability the core drives.
//!
//! Implementations own process spawning, timeouts and retries; the core
//! only sequences calls. Every call is awaited before the next is issued.

use crate::error::{ProviderError, SyncError};
use crate::layout::RemotePath;
use std::fmt;
use std::path::{Path, PathBuf};

/// Either end of a mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Remote(RemotePath),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Remote(path) => write!(f, "{}", path),
        }
    }
}

/// One-way sync making `destination` identical to `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRequest {
    pub source: Location,
    pub destination: Location,
    pub excludes: Vec<String>,
    /// Report what would change without writing anything.
    pub dry_run: bool,
    /// Transfer log written by the sync tool.
    pub log_file: Option<PathBuf>,
}

#[allow(async_fn_in_trait)]
pub trait RemoteProvider {
    /// Configured remote names, without the trailing `:`.
    async fn list_remotes(&self) -> Result<Vec<String>, ProviderError>;

    /// Combined comparison output: one line per path, prefixed by a marker
    /// character (`=`, `*`, `+`, `-`, `!`) and a space.
    async fn compare_combined(
        &self,
        local: &Path,
        remote: &RemotePath,
        excludes: &[String],
    ) -> Result<Vec<String>, ProviderError>;

    /// Copy a single file without moving data through this host.
    async fn copy_server_side(&self, src: &RemotePath, dst: &RemotePath) -> Result<(), ProviderError>;

    /// Run the mirror and return the tool's exit code.
    async fn mirror(&self, request: &MirrorRequest) -> Result<i32, ProviderError>;

    /// Names of the immediate child directories of `path`.
    ///
    /// A missing `path` is reported as [`ProviderError::NotFound`].
    async fn list_dirs(&self, path: &RemotePath) -> Result<Vec<String>, ProviderError>;

    /// Recursively delete `path` and everything below it.
    async fn purge_dir(&self, path: &RemotePath) -> Result<(), ProviderError>;

    /// Human-readable version line of the underlying tool.
    async fn version(&self) -> Result<String, ProviderError>;
}

/// Fail with a configuration error unless `remote` is configured.
pub async fn ensure_remote<P: RemoteProvider>(provider: &P, remote: &str) -> crate::Result<()> {
    let remotes = provider.list_remotes().await?;
    if remotes.iter().any(|r| r == remote) {
        Ok(())
    } else {
        Err(SyncError::Config(format!(
            "remote '{}' not found (configured: {})",
            remote,
            if remotes.is_empty() { "none".to_string() } else { remotes.join(", ") }
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProvider;

    #[tokio::test]
    async fn test_ensure_remote() {
        let provider = MockProvider::new().with_remotes(&["gdrive", "s3"]);
        assert!(ensure_remote(&provider, "gdrive").await.is_ok());

        let err = ensure_remote(&provider, "dropbox").await.unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
        assert!(err.to_string().contains("dropbox"));
    }
}
