//! Scripted in-memory provider that records every call in order.

use crate::error::ProviderError;
use crate::layout::RemotePath;
use crate::provider::{MirrorRequest, RemoteProvider};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListRemotes,
    Compare { local: PathBuf, remote: String },
    Copy { src: String, dst: String },
    Mirror { source: String, destination: String, dry_run: bool },
    ListDirs(String),
    Purge(String),
    Version,
}

impl Call {
    /// Whether this call writes to either side.
    pub fn is_mutating(&self) -> bool {
        match self {
            Call::Copy { .. } | Call::Purge(_) => true,
            Call::Mirror { dry_run, .. } => !dry_run,
            _ => false,
        }
    }
}

#[derive(Default)]
pub struct MockProvider {
    remotes: Vec<String>,
    compare: HashMap<String, Vec<String>>,
    compare_failures: HashSet<String>,
    dirs: HashMap<String, Vec<String>>,
    list_failures: HashSet<String>,
    copy_failures: HashSet<String>,
    purge_failures: HashSet<String>,
    mirror_codes: HashMap<String, i32>,
    mirror_spawn_failures: HashSet<String>,
    calls: Mutex<Vec<Call>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remotes(mut self, remotes: &[&str]) -> Self {
        self.remotes = remotes.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_compare(mut self, remote: &str, lines: &[&str]) -> Self {
        self.compare
            .insert(remote.to_string(), lines.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn with_compare_failure(mut self, remote: &str) -> Self {
        self.compare_failures.insert(remote.to_string());
        self
    }

    pub fn with_dirs(mut self, path: &str, names: &[&str]) -> Self {
        self.dirs
            .insert(path.to_string(), names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn with_list_failure(mut self, path: &str) -> Self {
        self.list_failures.insert(path.to_string());
        self
    }

    pub fn with_copy_failure(mut self, src: &str) -> Self {
        self.copy_failures.insert(src.to_string());
        self
    }

    pub fn with_purge_failure(mut self, path: &str) -> Self {
        self.purge_failures.insert(path.to_string());
        self
    }

    pub fn with_mirror_code(mut self, destination: &str, code: i32) -> Self {
        self.mirror_codes.insert(destination.to_string(), code);
        self
    }

    pub fn with_mirror_spawn_failure(mut self, destination: &str) -> Self {
        self.mirror_spawn_failures.insert(destination.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn failed(operation: &'static str) -> ProviderError {
        ProviderError::Failed {
            operation,
            code: 1,
            stderr: "scripted failure".to_string(),
        }
    }
}

impl RemoteProvider for MockProvider {
    async fn list_remotes(&self) -> Result<Vec<String>, ProviderError> {
        self.record(Call::ListRemotes);
        Ok(self.remotes.clone())
    }

    async fn compare_combined(
        &self,
        local: &Path,
        remote: &RemotePath,
        _excludes: &[String],
    ) -> Result<Vec<String>, ProviderError> {
        let key = remote.to_string();
        self.record(Call::Compare {
            local: local.to_path_buf(),
            remote: key.clone(),
        });
        if self.compare_failures.contains(&key) {
            return Err(ProviderError::Timeout {
                operation: "check",
                secs: 1,
            });
        }
        Ok(self.compare.get(&key).cloned().unwrap_or_default())
    }

    async fn copy_server_side(&self, src: &RemotePath, dst: &RemotePath) -> Result<(), ProviderError> {
        let src = src.to_string();
        self.record(Call::Copy {
            src: src.clone(),
            dst: dst.to_string(),
        });
        if self.copy_failures.contains(&src) {
            return Err(Self::failed("copyto"));
        }
        Ok(())
    }

    async fn mirror(&self, request: &MirrorRequest) -> Result<i32, ProviderError> {
        let destination = request.destination.to_string();
        self.record(Call::Mirror {
            source: request.source.to_string(),
            destination: destination.clone(),
            dry_run: request.dry_run,
        });
        if self.mirror_spawn_failures.contains(&destination) {
            return Err(ProviderError::Spawn {
                program: "mock".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            });
        }
        Ok(self.mirror_codes.get(&destination).copied().unwrap_or(0))
    }

    async fn list_dirs(&self, path: &RemotePath) -> Result<Vec<String>, ProviderError> {
        let key = path.to_string();
        self.record(Call::ListDirs(key.clone()));
        if self.list_failures.contains(&key) {
            return Err(Self::failed("lsf"));
        }
        self.dirs
            .get(&key)
            .cloned()
            .ok_or(ProviderError::NotFound(key))
    }

    async fn purge_dir(&self, path: &RemotePath) -> Result<(), ProviderError> {
        let key = path.to_string();
        self.record(Call::Purge(key.clone()));
        if self.purge_failures.contains(&key) {
            return Err(Self::failed("purge"));
        }
        Ok(())
    }

    async fn version(&self) -> Result<String, ProviderError> {
        self.record(Call::Version);
        Ok("mock v1.0".to_string())
    }
}
