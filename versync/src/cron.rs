//! Reads and writes the user's crontab through the `crontab` command.

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::info;
use versync_core::schedule;

/// Current crontab text; `Ok(None)` when the user has no crontab.
pub async fn read_crontab() -> anyhow::Result<Option<String>> {
    let output = Command::new("crontab")
        .arg("-l")
        .stdin(Stdio::null())
        .output()
        .await
        .context("crontab not available")?;

    if output.status.success() {
        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    } else {
        Ok(None)
    }
}

async fn write_crontab(content: &str) -> anyhow::Result<()> {
    let mut child = Command::new("crontab")
        .arg("-")
        .stdin(Stdio::piped())
        .spawn()
        .context("crontab not available")?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(content.as_bytes()).await?;
        stdin.shutdown().await?;
    }

    let status = child.wait().await?;
    if !status.success() {
        anyhow::bail!("crontab exited with {}", status);
    }
    Ok(())
}

/// The entry that `install` would write.
pub fn planned_entry(schedule_expr: &str, config_path: &Path, log_file: Option<&Path>) -> anyhow::Result<String> {
    let exe = std::env::current_exe().context("cannot locate the versync executable")?;
    let config_path = std::fs::canonicalize(config_path)
        .with_context(|| format!("cannot resolve {}", config_path.display()))?;
    let log_file = match log_file {
        Some(path) => path.to_path_buf(),
        None => default_log_file(&config_path),
    };
    let command = schedule::build_command(&exe, &config_path, &log_file);
    Ok(schedule::render_entry(schedule_expr, &command))
}

fn default_log_file(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("versync-cron.log")
}

pub async fn show(schedule_expr: Option<&str>, config_path: &Path, log_file: Option<&Path>) -> anyhow::Result<()> {
    match read_crontab().await? {
        Some(text) => {
            let entries = schedule::find_entries(&text);
            if entries.is_empty() {
                println!("Active:   No (run `versync cron install`)");
            }
            for entry in entries {
                println!("Active:   Yes");
                println!("Schedule: {}", entry.schedule);
                println!("Command:  {}", entry.command);
            }
        }
        None => println!("No crontab configured"),
    }

    match schedule_expr {
        Some(expr) => println!("Configured: {}", planned_entry(expr, config_path, log_file)?),
        None => println!("Configured: (no [schedule] cron in config)"),
    }
    Ok(())
}

pub async fn install(schedule_expr: Option<&str>, config_path: &Path, log_file: Option<&Path>) -> anyhow::Result<()> {
    let expr = schedule_expr.context("no [schedule] cron set in the config")?;
    schedule::validate_cron(expr)?;
    let entry = planned_entry(expr, config_path, log_file)?;

    let existing = read_crontab().await?.unwrap_or_default();
    write_crontab(&schedule::install_entry(&existing, &entry)).await?;

    info!("Installed cron entry: {}", entry);
    Ok(())
}

pub async fn remove() -> anyhow::Result<()> {
    let Some(existing) = read_crontab().await? else {
        info!("No crontab configured, nothing to remove");
        return Ok(());
    };

    let (updated, removed) = schedule::remove_entries(&existing);
    if removed == 0 {
        info!("No versync cron entry found");
        return Ok(());
    }
    write_crontab(&updated).await?;
    info!("Removed {} cron entr{}", removed, if removed == 1 { "y" } else { "ies" });
    Ok(())
}
