//! versync - Main entry point
//!
//! Mirrors local directories to an rclone remote, archiving the previous
//! version of every changed or deleted file before it is overwritten.

mod config;
mod cron;
mod logger;
mod rclone;
mod status;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{Config, Resolved};
use rclone::RcloneProvider;
use std::path::{Path, PathBuf};
use versync_core::backup::BackupRunner;
use versync_core::provider::ensure_remote;
use versync_core::restore::RestoreRunner;
use versync_core::VersionStamp;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", env = "VERSYNC_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Archive changed and deleted files, mirror local to remote, prune old versions
    Backup(RunArgs),

    /// Mirror the remote `current/` back to the local directories
    Restore(RunArgs),

    /// Show configuration, last backup per source, cron and rclone state
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the scheduled backup in the user's crontab
    Cron {
        #[command(subcommand)]
        action: CronAction,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Report what would be transferred without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Only process these source folders (repeatable)
    #[arg(long, value_name = "FOLDER")]
    only: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum CronAction {
    /// Show the installed entry and the one the config describes
    Show,
    /// Install or replace the entry from `[schedule] cron`
    Install,
    /// Remove the entry
    Remove,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)?;

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    logger::init(log_level)?;

    let base_dir = config_dir(&args.config);
    let resolved = config.resolve(&base_dir)?;
    let provider = RcloneProvider::from_config(&config.rclone);

    let code = match args.command {
        Command::Backup(run) => backup(&provider, &resolved, &run).await?,
        Command::Restore(run) => restore(&provider, &resolved, &run).await?,
        Command::Status { json } => {
            let report = status::gather(&provider, &resolved).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", status::render(&report));
            }
            0
        }
        Command::Cron { action } => {
            let schedule = resolved.schedule.as_deref();
            let log_file = config.schedule.log_file.as_deref();
            match action {
                CronAction::Show => cron::show(schedule, &args.config, log_file).await?,
                CronAction::Install => cron::install(schedule, &args.config, log_file).await?,
                CronAction::Remove => cron::remove().await?,
            }
            0
        }
    };

    std::process::exit(code)
}

fn config_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

async fn backup(provider: &RcloneProvider, resolved: &Resolved, run: &RunArgs) -> Result<i32> {
    let sources = resolved.select(&run.only)?;
    config::check_paths(&sources)?;
    ensure_remote(provider, &resolved.layout.remote).await?;

    let stamp = VersionStamp::now();
    tracing::info!(stamp = %stamp, sources = sources.len(), "Starting backup");
    let summary = BackupRunner::new(provider, resolved.layout.clone(), resolved.retention, stamp)
        .dry_run(run.dry_run)
        .run_all(&sources)
        .await;
    Ok(summary.exit_code())
}

async fn restore(provider: &RcloneProvider, resolved: &Resolved, run: &RunArgs) -> Result<i32> {
    let sources = resolved.select(&run.only)?;
    config::check_paths(&sources)?;
    ensure_remote(provider, &resolved.layout.remote).await?;

    let stamp = VersionStamp::now();
    tracing::info!(stamp = %stamp, sources = sources.len(), "Starting restore");
    let summary = RestoreRunner::new(provider, resolved.layout.clone(), stamp)
        .dry_run(run.dry_run)
        .run_all(&sources)
        .await;
    Ok(summary.exit_code())
}
