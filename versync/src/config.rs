//! Configuration management.
//!
//! Loads the TOML file and resolves it into the sources, layout and
//! retention policy the core runs with.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use versync_core::{RemoteLayout, RetentionPolicy, Source, SyncError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub remote: RemoteConfig,

    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Single-source form: `[source] path = ...` with `remote.folder`.
    #[serde(default)]
    pub source: Option<LegacySourceConfig>,

    #[serde(default)]
    pub exclude: ExcludeConfig,

    #[serde(default)]
    pub versions: VersionsConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub rclone: RcloneConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// rclone remote name, without the trailing `:`
    pub name: String,

    /// Folder on the remote that holds every source's folder
    #[serde(default)]
    pub root: String,

    /// Remote folder for the single-source form
    #[serde(default)]
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub folder: String,

    /// Patterns added after the global ones
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Log directory (default: `<path>/logs`)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacySourceConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeConfig {
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionsConfig {
    #[serde(default = "default_keep_changed")]
    pub keep_changed: usize,

    #[serde(default = "default_keep_deleted")]
    pub keep_deleted: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Five-field cron expression or `@daily` style shorthand
    #[serde(default)]
    pub cron: Option<String>,

    /// Where cron runs append their output (default: next to the config)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcloneConfig {
    #[serde(default = "default_rclone_binary")]
    pub binary: PathBuf,

    /// Limit for check/copyto/lsf/purge calls, 0 = none
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Limit for the sync itself, 0 = none
    #[serde(default)]
    pub sync_timeout_secs: u64,

    /// Alternative rclone.conf
    #[serde(default)]
    pub config: Option<PathBuf>,
}

// Default values
fn default_keep_changed() -> usize {
    versync_core::source::DEFAULT_KEEP_CHANGED
}

fn default_keep_deleted() -> usize {
    versync_core::source::DEFAULT_KEEP_DELETED
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rclone_binary() -> PathBuf {
    PathBuf::from("rclone")
}

fn default_timeout_secs() -> u64 {
    600
}

impl Default for VersionsConfig {
    fn default() -> Self {
        Self {
            keep_changed: default_keep_changed(),
            keep_deleted: default_keep_deleted(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for RcloneConfig {
    fn default() -> Self {
        Self {
            binary: default_rclone_binary(),
            timeout_secs: default_timeout_secs(),
            sync_timeout_secs: 0,
            config: None,
        }
    }
}

/// Configuration after validation, ready for the core.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub layout: RemoteLayout,
    pub retention: RetentionPolicy,
    pub sources: Vec<Source>,
    pub global_excludes: usize,
    pub schedule: Option<String>,
}

impl Resolved {
    /// Restrict to the named folders; an empty list keeps every source.
    pub fn select(&self, only: &[String]) -> Result<Vec<Source>, SyncError> {
        if only.is_empty() {
            return Ok(self.sources.clone());
        }
        for folder in only {
            if !self.sources.iter().any(|s| &s.folder == folder) {
                return Err(SyncError::Config(format!("no source with folder '{}'", folder)));
            }
        }
        Ok(self
            .sources
            .iter()
            .filter(|s| only.contains(&s.folder))
            .cloned()
            .collect())
    }
}

/// Every source directory must exist before a run starts.
pub fn check_paths(sources: &[Source]) -> Result<(), SyncError> {
    for source in sources {
        if !source.local_path.is_dir() {
            return Err(SyncError::Config(format!(
                "source path does not exist: {}",
                source.local_path.display()
            )));
        }
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SyncError> {
        if !path.is_file() {
            return Err(SyncError::Config(format!(
                "config file not found: {} (copy config.template.toml and edit it)",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, SyncError> {
        toml::from_str(content).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Validate and resolve. Relative source paths are taken relative to
    /// `base_dir` (the config file's directory).
    pub fn resolve(&self, base_dir: &Path) -> Result<Resolved, SyncError> {
        if self.remote.name.trim().is_empty() {
            return Err(SyncError::Config("remote.name is empty".to_string()));
        }
        if let Some(cron) = &self.schedule.cron {
            versync_core::schedule::validate_cron(cron)?;
        }

        let mut entries: Vec<SourceConfig> = self.sources.clone();
        if let Some(legacy) = &self.source {
            let folder = self.remote.folder.clone().ok_or_else(|| {
                SyncError::Config("[source] requires remote.folder".to_string())
            })?;
            entries.push(SourceConfig {
                path: legacy.path.clone(),
                folder,
                exclude: Vec::new(),
                log_dir: None,
            });
        }
        if entries.is_empty() {
            return Err(SyncError::Config("no sources defined".to_string()));
        }

        let mut seen = HashSet::new();
        let mut sources = Vec::with_capacity(entries.len());
        for entry in entries {
            let folder = entry.folder.trim().trim_matches('/').to_string();
            if folder.is_empty() {
                return Err(SyncError::Config(format!(
                    "source {} has an empty folder",
                    entry.path.display()
                )));
            }
            if !seen.insert(folder.clone()) {
                return Err(SyncError::Config(format!("duplicate source folder '{}'", folder)));
            }

            let mut excludes = self.exclude.patterns.clone();
            excludes.extend(entry.exclude.iter().cloned());

            let local_path = absolutize(base_dir, &entry.path);
            let mut source = Source::new(local_path, folder).with_excludes(excludes);
            if let Some(dir) = &entry.log_dir {
                source.log_dir = absolutize(base_dir, dir);
            }
            sources.push(source);
        }

        Ok(Resolved {
            layout: RemoteLayout::new(self.remote.name.trim(), self.remote.root.as_str()),
            retention: RetentionPolicy {
                keep_changed: self.versions.keep_changed,
                keep_deleted: self.versions.keep_deleted,
            },
            sources,
            global_excludes: self.exclude.patterns.len(),
            schedule: self.schedule.cron.clone(),
        })
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL: &str = r#"
[remote]
name = "gdrive"
root = "backups"

[[sources]]
path = "/srv/project"
folder = "project"
exclude = ["target/**"]

[[sources]]
path = "notes"
folder = "notes"
log_dir = "/var/log/versync"

[exclude]
patterns = [".git/**", "logs/**"]

[versions]
keep_changed = 3

[schedule]
cron = "0 */6 * * *"
"#;

    #[test]
    fn test_parse_and_resolve() {
        let config = Config::parse(FULL).unwrap();
        let resolved = config.resolve(Path::new("/etc/versync")).unwrap();

        assert_eq!(resolved.retention.keep_changed, 3);
        assert_eq!(resolved.retention.keep_deleted, 10);
        assert_eq!(resolved.layout, RemoteLayout::new("gdrive", "backups"));
        assert_eq!(resolved.schedule.as_deref(), Some("0 */6 * * *"));

        let project = &resolved.sources[0];
        assert_eq!(project.excludes, vec![".git/**", "logs/**", "target/**"]);
        assert_eq!(project.log_dir, PathBuf::from("/srv/project/logs"));

        let notes = &resolved.sources[1];
        assert_eq!(notes.local_path, PathBuf::from("/etc/versync/notes"));
        assert_eq!(notes.log_dir, PathBuf::from("/var/log/versync"));
        assert_eq!(notes.excludes, vec![".git/**", "logs/**"]);
    }

    #[test]
    fn test_defaults() {
        let config = Config::parse(
            "[remote]\nname = \"r\"\n[[sources]]\npath = \"/a\"\nfolder = \"a\"\n",
        )
        .unwrap();

        assert_eq!(config.versions.keep_changed, 5);
        assert_eq!(config.versions.keep_deleted, 10);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.rclone.binary, PathBuf::from("rclone"));
        assert_eq!(config.rclone.timeout_secs, 600);
        assert!(config.schedule.cron.is_none());
    }

    #[test]
    fn test_legacy_single_source() {
        let config = Config::parse(
            "[remote]\nname = \"gdrive\"\nfolder = \"project\"\n[source]\npath = \"/home/me/project\"\n",
        )
        .unwrap();
        let resolved = config.resolve(Path::new("/")).unwrap();

        assert_eq!(resolved.sources.len(), 1);
        assert_eq!(resolved.sources[0].folder, "project");
        assert_eq!(
            resolved.layout.folder("project").current().to_string(),
            "gdrive:project/current"
        );
    }

    #[test]
    fn test_config_errors() {
        let no_sources = Config::parse("[remote]\nname = \"r\"\n").unwrap();
        assert!(matches!(no_sources.resolve(Path::new("/")), Err(SyncError::Config(_))));

        let duplicate = Config::parse(
            "[remote]\nname = \"r\"\n[[sources]]\npath = \"/a\"\nfolder = \"x\"\n[[sources]]\npath = \"/b\"\nfolder = \"x/\"\n",
        )
        .unwrap();
        let err = duplicate.resolve(Path::new("/")).unwrap_err();
        assert!(err.to_string().contains("duplicate"));

        let bad_cron = Config::parse(
            "[remote]\nname = \"r\"\n[[sources]]\npath = \"/a\"\nfolder = \"a\"\n[schedule]\ncron = \"every day\"\n",
        )
        .unwrap();
        assert!(bad_cron.resolve(Path::new("/")).is_err());

        assert!(Config::parse("[remote]\n").is_err());
    }

    #[test]
    fn test_select_only() {
        let resolved = Config::parse(FULL).unwrap().resolve(Path::new("/")).unwrap();

        assert_eq!(resolved.select(&[]).unwrap().len(), 2);
        let only = resolved.select(&["notes".to_string()]).unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].folder, "notes");
        assert!(resolved.select(&["missing".to_string()]).is_err());
    }

    #[test]
    fn test_missing_file_and_paths() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        let err = Config::from_file(&dir.path().join("config.toml")).unwrap_err();
        assert!(err.to_string().contains("config file not found"));

        let present = Source::new(dir.path(), "here");
        let absent = Source::new(dir.path().join("absent"), "absent");
        assert!(check_paths(&[present.clone()]).is_ok());
        assert!(check_paths(&[present, absent]).is_err());
        Ok(())
    }

    #[test]
    fn test_template_parses() {
        let config = Config::parse(include_str!("../config.template.toml")).unwrap();
        let resolved = config.resolve(Path::new("/")).unwrap();
        assert_eq!(resolved.sources[0].folder, "project");
        assert_eq!(resolved.global_excludes, 4);
    }

    #[test]
    fn test_from_file() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.toml");
        std::fs::write(&path, FULL)?;

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.sources.len(), 2);
        Ok(())
    }
}
