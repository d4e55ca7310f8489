//! Restore: mirror each source's remote `current/` back to its local path.
//!
//! Nothing is archived or pruned; only the local side is written.

use crate::backup::{echo_transfer_summary, log_summary, prepare_log, run_mirror};
use crate::layout::RemoteLayout;
use crate::logfile::RunKind;
use crate::outcome::{RunSummary, SourceOutcome, SourceResult, Step};
use crate::provider::{Location, MirrorRequest, RemoteProvider};
use crate::source::Source;
use crate::stamp::VersionStamp;
use tracing::{error, info};

pub struct RestoreRunner<'a, P> {
    provider: &'a P,
    layout: RemoteLayout,
    stamp: VersionStamp,
    dry_run: bool,
}

impl<'a, P: RemoteProvider> RestoreRunner<'a, P> {
    pub fn new(provider: &'a P, layout: RemoteLayout, stamp: VersionStamp) -> Self {
        Self {
            provider,
            layout,
            stamp,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

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
        log_summary("RESTORE", &summary);
        summary
    }

    pub async fn run_source(&self, source: &Source) -> SourceOutcome {
        let current = self.layout.folder(&source.folder).current();
        let mut outcome = SourceOutcome::new(&source.folder);

        info!("=== RESTORE {} ===", source.folder);
        info!("Source:   {}", current);
        info!("Dest:     {}", source.local_path.display());
        if self.dry_run {
            info!("Mode:     DRY RUN (no files will be transferred)");
        }

        outcome.steps.push(Step::Mirror);
        let log_file = prepare_log(&source.log_dir, RunKind::Restore, &self.stamp).await;
        let request = MirrorRequest {
            source: Location::Remote(current),
            destination: Location::Local(source.local_path.clone()),
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

        match &outcome.result {
            SourceResult::Success => info!("=== RESTORE {} COMPLETE ===", source.folder),
            other => error!("=== RESTORE {} FAILED (exit code: {}) ===", source.folder, other.exit_code()),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, MockProvider};
    use tempfile::TempDir;

    fn runner(provider: &MockProvider) -> RestoreRunner<'_, MockProvider> {
        RestoreRunner::new(
            provider,
            RemoteLayout::new("gdrive", "root"),
            VersionStamp::parse("2024-04-01_12-00-00").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_restore_mirrors_remote_to_local() {
        let dir = TempDir::new().unwrap();
        let src = Source::new(dir.path().join("proj"), "proj").with_excludes(vec!["*.tmp".into()]);
        let provider = MockProvider::new();

        let outcome = runner(&provider).run_source(&src).await;

        assert!(outcome.result.is_success());
        assert_eq!(
            provider.calls(),
            vec![Call::Mirror {
                source: "gdrive:root/proj/current".into(),
                destination: src.local_path.display().to_string(),
                dry_run: false,
            }]
        );
        assert_eq!(
            outcome.log_file,
            Some(src.log_dir.join("2024-04-01_12-00-00_restore.log"))
        );
    }

    #[tokio::test]
    async fn test_restore_never_archives_or_prunes() {
        let dir = TempDir::new().unwrap();
        let src = Source::new(dir.path().join("proj"), "proj");
        let provider = MockProvider::new().with_compare("gdrive:root/proj/current", &["* a"]);

        runner(&provider).dry_run(true).run_source(&src).await;

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].is_mutating());
    }

    #[tokio::test]
    async fn test_restore_exit_code_from_mirror() {
        let dir = TempDir::new().unwrap();
        let a = Source::new(dir.path().join("a"), "a");
        let b = Source::new(dir.path().join("b"), "b");
        let provider = MockProvider::new().with_mirror_code(&a.local_path.display().to_string(), 9);

        let summary = runner(&provider).run_all(&[a, b]).await;

        assert_eq!(summary.exit_code(), 9);
        assert!(summary.sources[1].result.is_success());
    }
}
