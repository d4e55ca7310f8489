//! Backup orchestration.
//!
//! Per source the steps run strictly in this order:
//!
//! ```text
//! classify → archive .changed → archive .deleted → mirror → prune .changed → prune .deleted
//! ```
//!
//! Archiving must complete before the mirror overwrites `current/`; pruning
//! runs whatever the mirror's outcome. Sources are processed one at a time
//! and a failing source never stops the ones after it.

use crate::archive::archive;
use crate::classify::classify;
use crate::layout::{Bucket, RemoteLayout};
use crate::logfile::{self, RunKind};
use crate::outcome::{RunSummary, SourceOutcome, SourceResult, Step};
use crate::provider::{Location, MirrorRequest, RemoteProvider};
use crate::retention::prune;
use crate::source::{RetentionPolicy, Source};
use crate::stamp::VersionStamp;
use std::path::PathBuf;
use tracing::{error, info, warn};

pub struct BackupRunner<'a, P> {
    provider: &'a P,
    layout: RemoteLayout,
    retention: RetentionPolicy,
    stamp: VersionStamp,
    dry_run: bool,
}

impl<'a, P: RemoteProvider> BackupRunner<'a, P> {
    pub fn new(provider: &'a P, layout: RemoteLayout, retention: RetentionPolicy, stamp: VersionStamp) -> Self {
        Self {
            provider,
            layout,
            retention,
            stamp,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Back up every source in order and aggregate the results.
    pub async fn run_all(&self, sources: &[Source]) -> RunSummary {
        let mut outcomes = Vec::with_capacity(sources.len());
        for source in sources {
            outcomes.push(self.run_source(source).await);
        }

        let summary = RunSummary {
            stamp: self.stamp.clone(),
            dry_run: self.dry_run,
            sources: outcomes,
        };
        log_summary("BACKUP", &summary);
        summary
    }

    pub async fn run_source(&self, source: &Source) -> SourceOutcome {
        let folder = self.layout.folder(&source.folder);
        let current = folder.current();
        let mut outcome = SourceOutcome::new(&source.folder);

        info!("=== BACKUP {} ===", source.folder);
        info!("Source:        {}", source.local_path.display());
        info!("Destination:   {}", current);
        info!("Keep changed:  {} versions", self.retention.keep_changed);
        info!("Keep deleted:  {} versions", self.retention.keep_deleted);
        if self.dry_run {
            info!("Mode:          DRY RUN (no files will be transferred)");
        }

        if !source.local_path.is_dir() {
            error!(folder = %source.folder, "Source path does not exist: {}", source.local_path.display());
            outcome.result = SourceResult::SourceMissing;
            return outcome;
        }

        info!("--- Step 1: Comparing local vs remote ---");
        outcome.steps.push(Step::Classify);
        let classification = match classify(self.provider, &source.local_path, &current, &source.excludes).await {
            Ok(c) => c,
            Err(e) => {
                error!(folder = %source.folder, error = %e, "Comparison failed, skipping source");
                outcome.result = SourceResult::ClassifyFailed { error: e.to_string() };
                return outcome;
            }
        };
        info!("  Unchanged:   {}", classification.unchanged);
        info!("  Changed:     {}", classification.changed.len());
        info!("  New:         {}", classification.new.len());
        info!("  Deleted:     {}", classification.deleted.len());
        if !classification.errors.is_empty() {
            warn!("  Errors:      {}", classification.errors.len());
            for path in &classification.errors {
                warn!("    could not compare: {}", path);
            }
        }

        for (n, step, bucket, files) in [
            (2, Step::ArchiveChanged, Bucket::Changed, &classification.changed),
            (3, Step::ArchiveDeleted, Bucket::Deleted, &classification.deleted),
        ] {
            outcome.steps.push(step);
            let label = &bucket.dir_name()[1..];
            if files.is_empty() {
                info!("--- Step {}: No {} files to archive ---", n, label);
                continue;
            }
            info!("--- Step {}: Archiving {} files ---", n, label);
            let report = archive(self.provider, &folder, files, bucket, &self.stamp, self.dry_run).await;
            outcome.archives.push(report);
        }
        outcome.classification = Some(classification);

        info!("--- Step 4: Syncing to remote ---");
        outcome.steps.push(Step::Mirror);
        let log_file = prepare_log(&source.log_dir, RunKind::Backup, &self.stamp).await;
        let request = MirrorRequest {
            source: Location::Local(source.local_path.clone()),
            destination: Location::Remote(current),
            excludes: source.excludes.clone(),
            dry_run: self.dry_run,
            log_file: log_file.clone(),
        };
        let code = run_mirror(self.provider, &request, &source.folder).await;
        outcome.result = SourceResult::from_mirror_code(code);
        if let Some(path) = &log_file {
            echo_transfer_summary(path).await;
        }
        outcome.log_file = log_file;

        info!("--- Step 5: Pruning old versions ---");
        for (step, bucket) in [(Step::PruneChanged, Bucket::Changed), (Step::PruneDeleted, Bucket::Deleted)] {
            outcome.steps.push(step);
            let keep = self.retention.keep_for(bucket);
            outcome.prunes.push(prune(self.provider, &folder, bucket, keep, self.dry_run).await);
        }

        match &outcome.result {
            SourceResult::Success => info!("=== BACKUP {} COMPLETE ===", source.folder),
            other => error!("=== BACKUP {} FAILED (exit code: {}) ===", source.folder, other.exit_code()),
        }
        let lost: Vec<&str> = outcome.lost_versions().collect();
        if !lost.is_empty() {
            warn!(
                "{} file(s) were synced without archiving their previous version: {}",
                lost.len(),
                lost.join(", ")
            );
        }

        outcome
    }
}

/// Create the log directory and return the log path, or `None` (with a
/// warning) if the directory cannot be created.
pub(crate) async fn prepare_log(dir: &std::path::Path, kind: RunKind, stamp: &VersionStamp) -> Option<PathBuf> {
    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => {
            let path = logfile::log_path(dir, kind, stamp);
            info!("Log:           {}", path.display());
            Some(path)
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot create log directory, running without a log file");
            None
        }
    }
}

/// Run the mirror; a mirror that cannot be started counts as exit code 1.
pub(crate) async fn run_mirror<P: RemoteProvider>(provider: &P, request: &MirrorRequest, folder: &str) -> i32 {
    match provider.mirror(request).await {
        Ok(code) => code,
        Err(e) => {
            error!(folder, error = %e, "Mirror could not run");
            1
        }
    }
}

pub(crate) async fn echo_transfer_summary(log_file: &std::path::Path) {
    let summary = logfile::read_summary(log_file).await;
    if summary.is_empty() {
        return;
    }
    info!("--- Transfer Summary ---");
    for line in summary {
        info!("  {}", line);
    }
}

pub(crate) fn log_summary(kind: &str, summary: &RunSummary) {
    for source in &summary.sources {
        match &source.result {
            SourceResult::Success => info!("  {:<20} ok", source.folder),
            other => warn!("  {:<20} failed (exit code {})", source.folder, other.exit_code()),
        }
    }
    let failed = summary.failed().count();
    if failed == 0 {
        info!("{} finished: {} source(s) ok", kind, summary.sources.len());
    } else {
        error!("{} finished: {} of {} source(s) failed", kind, failed, summary.sources.len());
    }
}
