//! Retention pruning of archive buckets.
//!
//! Version directories are append-only and expire oldest first; nothing
//! about how often a version is read affects eviction.

use crate::error::ProviderError;
use crate::layout::{Bucket, FolderLayout};
use crate::provider::RemoteProvider;
use crate::stamp::VersionStamp;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub bucket: Bucket,
    pub keep: usize,
    /// Version directories present before pruning.
    pub found: usize,
    pub removed: Vec<String>,
    /// Dry-run only: directories that would have been removed.
    pub planned: Vec<String>,
    pub failed: Vec<PruneFailure>,
    /// Set when the bucket could not be listed; nothing was pruned.
    pub listing_error: Option<String>,
}

impl PruneReport {
    fn new(bucket: Bucket, keep: usize) -> Self {
        Self {
            bucket,
            keep,
            found: 0,
            removed: Vec::new(),
            planned: Vec::new(),
            failed: Vec::new(),
            listing_error: None,
        }
    }
}

/// Split a directory listing into version stamps (sorted, oldest first) and
/// names that are not version directories.
pub fn version_dirs<I, S>(names: I) -> (Vec<VersionStamp>, Vec<String>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut stamps = Vec::new();
    let mut ignored = Vec::new();
    for name in names {
        let name = name.as_ref().trim().trim_end_matches('/');
        if name.is_empty() {
            continue;
        }
        match VersionStamp::parse(name) {
            Ok(stamp) => stamps.push(stamp),
            Err(_) => ignored.push(name.to_string()),
        }
    }
    stamps.sort();
    stamps.dedup();
    (stamps, ignored)
}

/// The oldest `count - keep` version directories, or nothing if
/// `count <= keep`.
pub fn select_expired<I, S>(names: I, keep: usize) -> Vec<VersionStamp>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let (stamps, _) = version_dirs(names);
    let excess = stamps.len().saturating_sub(keep);
    stamps.into_iter().take(excess).collect()
}

/// Remove the oldest version directories of `bucket` beyond `keep`.
///
/// Never fails: listing and purge errors end up in the report.
pub async fn prune<P: RemoteProvider>(
    provider: &P,
    layout: &FolderLayout,
    bucket: Bucket,
    keep: usize,
    dry_run: bool,
) -> PruneReport {
    let mut report = PruneReport::new(bucket, keep);
    let bucket_path = layout.bucket(bucket);

    let names = match provider.list_dirs(&bucket_path).await {
        Ok(names) => names,
        Err(ProviderError::NotFound(_)) => {
            debug!(bucket = %bucket, "No versions yet");
            return report;
        }
        Err(e) => {
            warn!(bucket = %bucket, error = %e, "Could not list {}/, skipping prune", bucket);
            report.listing_error = Some(e.to_string());
            return report;
        }
    };

    let (stamps, ignored) = version_dirs(&names);
    for name in &ignored {
        debug!(bucket = %bucket, name = %name, "Ignoring non-version directory");
    }
    report.found = stamps.len();

    let expired = select_expired(&names, keep);
    if expired.is_empty() {
        info!("{}/: {} version(s), keeping up to {}", bucket, stamps.len(), keep);
        return report;
    }

    info!(
        "Pruning {} old version(s) from {}/ (keeping {})",
        expired.len(),
        bucket,
        keep
    );

    for stamp in expired {
        let name = stamp.to_string();
        if dry_run {
            info!("  [dry-run] would remove: {}/{}/", bucket, name);
            report.planned.push(name);
            continue;
        }

        match provider.purge_dir(&bucket_path.join(&name)).await {
            Ok(()) => {
                info!("  Removed: {}/{}/", bucket, name);
                report.removed.push(name);
            }
            Err(e) => {
                warn!(bucket = %bucket, version = %name, error = %e, "Failed to remove {}/{}/", bucket, name);
                report.failed.push(PruneFailure {
                    name,
                    error: e.to_string(),
                });
            }
        }
    }

    report
}
