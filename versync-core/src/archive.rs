//! Server-side archiving of files about to be overwritten or removed.
//!
//! Every copy goes from `current/<path>` to `<bucket>/<stamp>/<path>` and
//! must finish before the mirror touches `current/`.

use crate::layout::{Bucket, FolderLayout};
use crate::provider::RemoteProvider;
use crate::stamp::VersionStamp;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveFailure {
    pub path: String,
    pub error: String,
}

/// What an archive pass did for one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveReport {
    pub bucket: Bucket,
    pub archived: Vec<String>,
    /// Dry-run only: files that would have been archived.
    pub planned: Vec<String>,
    pub failed: Vec<ArchiveFailure>,
}

impl ArchiveReport {
    fn new(bucket: Bucket) -> Self {
        Self {
            bucket,
            archived: Vec::new(),
            planned: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.archived.is_empty() && self.planned.is_empty() && self.failed.is_empty()
    }
}

/// Copy each of `files` into a new version directory of `bucket`.
///
/// Copies are independent: a failure is recorded and the next file is
/// still attempted. In dry-run mode no provider call is made.
pub async fn archive<P, I, S>(
    provider: &P,
    layout: &FolderLayout,
    files: I,
    bucket: Bucket,
    stamp: &VersionStamp,
    dry_run: bool,
) -> ArchiveReport
where
    P: RemoteProvider,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let files: Vec<S> = files.into_iter().collect();
    let mut report = ArchiveReport::new(bucket);
    if files.is_empty() {
        return report;
    }

    let current = layout.current();
    let version_dir = layout.version_dir(bucket, stamp);
    info!("Archiving {} file(s) to {}/{}/", files.len(), bucket, stamp);

    for file in &files {
        let path = file.as_ref();
        if dry_run {
            info!("  [dry-run] would archive: {}", path);
            report.planned.push(path.to_string());
            continue;
        }

        let src = current.join(path);
        let dst = version_dir.join(path);
        match provider.copy_server_side(&src, &dst).await {
            Ok(()) => report.archived.push(path.to_string()),
            Err(e) => {
                warn!(bucket = %bucket, path, error = %e, "Failed to archive {}", path);
                report.failed.push(ArchiveFailure {
                    path: path.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RemoteLayout;
    use crate::testing::{Call, MockProvider};

    fn setup() -> (FolderLayout, VersionStamp) {
        (
            RemoteLayout::new("gdrive", "root").folder("proj"),
            VersionStamp::parse("2024-05-01_10-00-00").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_empty_is_noop() {
        let (layout, stamp) = setup();
        let provider = MockProvider::new();

        let report = archive(&provider, &layout, Vec::<String>::new(), Bucket::Changed, &stamp, false).await;
        assert!(report.is_empty());
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_copies_into_version_dir() {
        let (layout, stamp) = setup();
        let provider = MockProvider::new();

        let report = archive(&provider, &layout, ["a.txt", "dir/b.txt"], Bucket::Deleted, &stamp, false).await;

        assert_eq!(report.archived, vec!["a.txt", "dir/b.txt"]);
        assert_eq!(
            provider.calls(),
            vec![
                Call::Copy {
                    src: "gdrive:root/proj/current/a.txt".into(),
                    dst: "gdrive:root/proj/.deleted/2024-05-01_10-00-00/a.txt".into(),
                },
                Call::Copy {
                    src: "gdrive:root/proj/current/dir/b.txt".into(),
                    dst: "gdrive:root/proj/.deleted/2024-05-01_10-00-00/dir/b.txt".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_remaining_files() {
        let (layout, stamp) = setup();
        let provider = MockProvider::new().with_copy_failure("gdrive:root/proj/current/b.txt");

        let report = archive(&provider, &layout, ["a.txt", "b.txt", "c.txt"], Bucket::Changed, &stamp, false).await;

        assert_eq!(report.archived, vec!["a.txt", "c.txt"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, "b.txt");
        assert_eq!(provider.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_calls() {
        let (layout, stamp) = setup();
        let provider = MockProvider::new();

        let report = archive(&provider, &layout, ["a.txt", "b.txt"], Bucket::Changed, &stamp, true).await;

        assert_eq!(report.planned, vec!["a.txt", "b.txt"]);
        assert!(report.archived.is_empty());
        assert!(provider.calls().is_empty());
    }
}
