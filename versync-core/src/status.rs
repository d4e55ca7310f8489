//! Status report assembled from injected facts.
//!
//! The caller gathers log directory listings, the newest log's text, the
//! crontab and the sync tool's remotes; nothing here touches the system.

use crate::logfile::{self, RunKind};
use crate::schedule::{self, CronEntry};
use crate::source::{RetentionPolicy, Source};
use crate::stamp::VersionStamp;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunHealth {
    Ok,
    Errors,
}

/// Backup history of one source, derived from its log directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct History {
    pub last_run: Option<VersionStamp>,
    pub latest_log: Option<PathBuf>,
    pub health: Option<RunHealth>,
    pub runs_logged: usize,
}

impl History {
    pub fn never() -> Self {
        Self {
            last_run: None,
            latest_log: None,
            health: None,
            runs_logged: 0,
        }
    }

    pub fn is_never(&self) -> bool {
        self.runs_logged == 0
    }
}

/// The newest backup log among `names` and how many there are.
pub fn latest_backup_log<I, S>(names: I) -> Option<(String, VersionStamp, usize)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut logs: Vec<(VersionStamp, String)> = names
        .into_iter()
        .filter_map(|n| {
            let name = n.as_ref();
            logfile::parse_log_name(name, RunKind::Backup).map(|s| (s, name.to_string()))
        })
        .collect();
    logs.sort();
    let count = logs.len();
    logs.pop().map(|(stamp, name)| (name, stamp, count))
}

/// Build the history from a log directory listing; `read_latest` is asked
/// for the text of the newest log only.
pub fn history<I, S, F>(log_dir: &std::path::Path, names: I, read_latest: F) -> History
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    F: FnOnce(&std::path::Path) -> Option<String>,
{
    let Some((name, stamp, count)) = latest_backup_log(names) else {
        return History::never();
    };
    let path = log_dir.join(name);
    let health = read_latest(&path).map(|content| {
        if logfile::has_errors(&content) {
            RunHealth::Errors
        } else {
            RunHealth::Ok
        }
    });
    History {
        last_run: Some(stamp),
        latest_log: Some(path),
        health,
        runs_logged: count,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
    pub folder: String,
    pub local_path: PathBuf,
    pub destination: String,
    pub path_exists: bool,
    pub excludes: usize,
    pub history: History,
}

impl SourceStatus {
    pub fn new(source: &Source, destination: String, path_exists: bool, history: History) -> Self {
        Self {
            folder: source.folder.clone(),
            local_path: source.local_path.clone(),
            destination,
            path_exists,
            excludes: source.excludes.len(),
            history,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CronState {
    Active { entries: Vec<CronEntry> },
    Inactive,
    /// No crontab could be read (none installed, or no cron on this host).
    Unavailable { reason: String },
}

impl CronState {
    pub fn from_crontab(crontab: &str) -> Self {
        let entries = schedule::find_entries(crontab);
        if entries.is_empty() {
            CronState::Inactive
        } else {
            CronState::Active { entries }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub version: Option<String>,
    pub remotes: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub generated_at: String,
    pub remote: String,
    pub remote_configured: bool,
    pub retention: RetentionPolicy,
    pub schedule: Option<String>,
    pub global_excludes: usize,
    pub sources: Vec<SourceStatus>,
    pub cron: CronState,
    pub tool: ToolStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_latest_backup_log_ignores_other_files() {
        let names = [
            "2024-01-02_00-00-00_backup.log",
            "2024-03-01_00-00-00_restore.log",
            "2024-02-01_00-00-00_backup.log",
            "notes.txt",
        ];
        let (name, stamp, count) = latest_backup_log(names).unwrap();
        assert_eq!(name, "2024-02-01_00-00-00_backup.log");
        assert_eq!(stamp.as_str(), "2024-02-01_00-00-00");
        assert_eq!(count, 2);
    }

    #[test]
    fn test_history_never_backed_up() {
        let h = history(Path::new("/logs"), ["readme.md"], |_| panic!("nothing to read"));
        assert!(h.is_never());
        assert_eq!(h, History::never());
    }

    #[test]
    fn test_history_reads_only_latest() {
        let names = ["2024-01-01_00-00-00_backup.log", "2024-01-05_00-00-00_backup.log"];
        let h = history(Path::new("/logs"), names, |path| {
            assert_eq!(path, Path::new("/logs/2024-01-05_00-00-00_backup.log"));
            Some("2024/01/05 ERROR : x: failed".to_string())
        });

        assert_eq!(h.health, Some(RunHealth::Errors));
        assert_eq!(h.runs_logged, 2);
        assert_eq!(h.last_run.unwrap().as_str(), "2024-01-05_00-00-00");
    }

    #[test]
    fn test_history_unreadable_log() {
        let h = history(Path::new("/logs"), ["2024-01-01_00-00-00_backup.log"], |_| None);
        assert_eq!(h.health, None);
        assert!(!h.is_never());
    }

    #[test]
    fn test_cron_state() {
        assert_eq!(CronState::from_crontab("0 1 * * * other\n"), CronState::Inactive);
        assert!(matches!(
            CronState::from_crontab("0 */6 * * * versync backup # versync\n"),
            CronState::Active { entries } if entries[0].schedule == "0 */6 * * *"
        ));
    }

    #[test]
    fn test_report_serializes() {
        let report = StatusReport {
            generated_at: "2024-01-01 00:00:00".into(),
            remote: "gdrive:backups/".into(),
            remote_configured: true,
            retention: RetentionPolicy::default(),
            schedule: None,
            global_excludes: 0,
            sources: vec![],
            cron: CronState::Unavailable { reason: "no crontab".into() },
            tool: ToolStatus { version: None, remotes: vec![], error: None },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["retention"]["keep_deleted"], 10);
        assert_eq!(json["cron"]["state"], "unavailable");
    }
}
