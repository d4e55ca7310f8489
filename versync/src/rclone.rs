//! rclone-backed remote provider.
//!
//! Each capability is one rclone invocation. Captured calls run under
//! `timeout_secs`; the sync streams to the terminal under its own limit.

use crate::config::RcloneConfig;
use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;
use versync_core::provider::{Location, MirrorRequest, RemoteProvider};
use versync_core::{ProviderError, RemotePath};

/// rclone's exit code for "directory not found".
const EXIT_DIR_NOT_FOUND: i32 = 3;

pub struct RcloneProvider {
    binary: PathBuf,
    config: Option<PathBuf>,
    timeout: Option<Duration>,
    sync_timeout: Option<Duration>,
}

fn limit(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

pub fn exclude_args(excludes: &[String]) -> Vec<OsString> {
    excludes
        .iter()
        .flat_map(|p| [OsString::from("--exclude"), OsString::from(p)])
        .collect()
}

fn location_arg(location: &Location) -> OsString {
    match location {
        Location::Local(path) => path.as_os_str().to_os_string(),
        Location::Remote(path) => OsString::from(path.to_string()),
    }
}

pub fn check_args(local: &Path, remote: &RemotePath, excludes: &[String]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "check".into(),
        local.as_os_str().to_os_string(),
        remote.to_string().into(),
        "--combined".into(),
        "-".into(),
    ];
    args.extend(exclude_args(excludes));
    args
}

pub fn sync_args(request: &MirrorRequest, progress: bool) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "sync".into(),
        location_arg(&request.source),
        location_arg(&request.destination),
    ];
    if progress {
        args.push("--progress".into());
    }
    args.extend(["--stats-one-line", "--stats", "10s"].map(OsString::from));
    if let Some(log_file) = &request.log_file {
        args.push("--log-file".into());
        args.push(log_file.as_os_str().to_os_string());
        args.extend(["--log-level", "INFO"].map(OsString::from));
    }
    args.extend(exclude_args(&request.excludes));
    if request.dry_run {
        args.push("--dry-run".into());
    }
    args
}

/// Lines of rclone stdout, without blanks.
fn lines(stdout: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

impl RcloneProvider {
    pub fn from_config(config: &RcloneConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            config: config.config.clone(),
            timeout: limit(config.timeout_secs),
            sync_timeout: limit(config.sync_timeout_secs),
        }
    }

    fn command(&self, args: &[OsString]) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(config) = &self.config {
            cmd.arg("--config").arg(config);
        }
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> ProviderError {
        ProviderError::Spawn {
            program: self.binary.display().to_string(),
            source,
        }
    }

    /// Run to completion with captured output; exit status is not checked.
    async fn capture(&self, operation: &'static str, args: Vec<OsString>) -> Result<Output, ProviderError> {
        debug!(operation, ?args, "rclone");
        let mut cmd = self.command(&args);
        let output = cmd.output();
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, output)
                .await
                .map_err(|_| ProviderError::Timeout {
                    operation,
                    secs: limit.as_secs(),
                })?,
            None => output.await,
        };
        result.map_err(|e| self.spawn_error(e))
    }

    /// Run and fail on a non-zero exit.
    async fn run(&self, operation: &'static str, args: Vec<OsString>) -> Result<Output, ProviderError> {
        let output = self.capture(operation, args).await?;
        if output.status.success() {
            return Ok(output);
        }
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(ProviderError::Failed {
            operation,
            code,
            stderr,
        })
    }
}

impl RemoteProvider for RcloneProvider {
    async fn list_remotes(&self) -> Result<Vec<String>, ProviderError> {
        let output = self.run("listremotes", vec!["listremotes".into()]).await?;
        Ok(lines(&output.stdout)
            .into_iter()
            .map(|r| r.trim().trim_end_matches(':').to_string())
            .collect())
    }

    async fn compare_combined(
        &self,
        local: &Path,
        remote: &RemotePath,
        excludes: &[String],
    ) -> Result<Vec<String>, ProviderError> {
        // check exits non-zero whenever something differs
        let output = self.capture("check", check_args(local, remote, excludes)).await?;
        debug!(code = ?output.status.code(), "rclone check finished");
        Ok(lines(&output.stdout))
    }

    async fn copy_server_side(&self, src: &RemotePath, dst: &RemotePath) -> Result<(), ProviderError> {
        self.run(
            "copyto",
            vec!["copyto".into(), src.to_string().into(), dst.to_string().into()],
        )
        .await
        .map(|_| ())
    }

    async fn mirror(&self, request: &MirrorRequest) -> Result<i32, ProviderError> {
        let args = sync_args(request, std::io::stdout().is_terminal());
        debug!(?args, "rclone sync");
        let mut cmd = self.command(&args);
        let status = cmd.status();
        let status = match self.sync_timeout {
            Some(limit) => tokio::time::timeout(limit, status)
                .await
                .map_err(|_| ProviderError::Timeout {
                    operation: "sync",
                    secs: limit.as_secs(),
                })?,
            None => status.await,
        }
        .map_err(|e| self.spawn_error(e))?;
        // killed by a signal
        Ok(status.code().unwrap_or(1))
    }

    async fn list_dirs(&self, path: &RemotePath) -> Result<Vec<String>, ProviderError> {
        let args = vec!["lsf".into(), path.to_string().into(), "--dirs-only".into()];
        match self.run("lsf", args).await {
            Ok(output) => Ok(lines(&output.stdout)),
            Err(ProviderError::Failed { code: EXIT_DIR_NOT_FOUND, .. }) => {
                Err(ProviderError::NotFound(path.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn purge_dir(&self, path: &RemotePath) -> Result<(), ProviderError> {
        self.run("purge", vec!["purge".into(), path.to_string().into()])
            .await
            .map(|_| ())
    }

    async fn version(&self) -> Result<String, ProviderError> {
        let output = self.run("version", vec!["version".into()]).await?;
        Ok(lines(&output.stdout).into_iter().next().unwrap_or_default())
    }
}
