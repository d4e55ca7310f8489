//! `versync status`: gathers facts from disk, crontab and rclone, then
//! renders the core's status report.

use crate::config::Resolved;
use crate::cron;
use std::path::Path;
use versync_core::status::{self, CronState, History, RunHealth, SourceStatus, StatusReport, ToolStatus};
use versync_core::RemoteProvider;

async fn log_names(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return names;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names
}

async fn tool_status<P: RemoteProvider>(provider: &P) -> ToolStatus {
    let version = provider.version().await;
    let remotes = provider.list_remotes().await;
    let error = match (&version, &remotes) {
        (Err(e), _) | (_, Err(e)) => Some(e.to_string()),
        _ => None,
    };
    ToolStatus {
        version: version.ok(),
        remotes: remotes.unwrap_or_default(),
        error,
    }
}

pub async fn gather<P: RemoteProvider>(provider: &P, resolved: &Resolved) -> StatusReport {
    let mut sources = Vec::with_capacity(resolved.sources.len());
    for source in &resolved.sources {
        let names = log_names(&source.log_dir).await;
        let history = status::history(&source.log_dir, names, |path| std::fs::read_to_string(path).ok());
        let destination = resolved.layout.folder(&source.folder).current().to_string();
        sources.push(SourceStatus::new(source, destination, source.local_path.is_dir(), history));
    }

    let cron = match cron::read_crontab().await {
        Ok(Some(text)) => CronState::from_crontab(&text),
        Ok(None) => CronState::Unavailable {
            reason: "no crontab configured".to_string(),
        },
        Err(e) => CronState::Unavailable { reason: e.to_string() },
    };

    let tool = tool_status(provider).await;
    let remote = &resolved.layout.remote;

    StatusReport {
        generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        remote: format!("{}:{}/", remote, resolved.layout.root),
        remote_configured: tool.remotes.iter().any(|r| r == remote),
        retention: resolved.retention,
        schedule: resolved.schedule.clone(),
        global_excludes: resolved.global_excludes,
        sources,
        cron,
        tool,
    }
}

fn section(out: &mut String, title: &str) {
    let rule = "─".repeat(50);
    out.push_str(&format!("\n{}\n  {}\n{}\n", rule, title, rule));
}

fn history_lines(out: &mut String, history: &History) {
    if history.is_never() {
        out.push_str("    Never backed up (no log files)\n");
        return;
    }
    if let Some(stamp) = &history.last_run {
        out.push_str(&format!("    Last:   {} UTC\n", stamp.to_naive().format("%Y-%m-%d %H:%M:%S")));
    }
    let result = match (history.health, &history.latest_log) {
        (Some(RunHealth::Ok), _) => "OK".to_string(),
        (Some(RunHealth::Errors), Some(log)) => format!("ERRORS (check {})", log.display()),
        (Some(RunHealth::Errors), None) => "ERRORS".to_string(),
        (None, _) => "unknown (log unreadable)".to_string(),
    };
    out.push_str(&format!("    Result: {}\n", result));
    out.push_str(&format!("    Total:  {} backup(s) logged\n", history.runs_logged));
}

pub fn render(report: &StatusReport) -> String {
    let mut out = String::new();
    let banner = "=".repeat(50);
    out.push_str(&format!("{}\n  versync status\n  {}\n{}\n", banner, report.generated_at, banner));

    section(&mut out, "Config");
    out.push_str(&format!(
        "  Remote:      {}{}\n",
        report.remote,
        if report.remote_configured { "" } else { " (remote not found)" }
    ));
    out.push_str(&format!(
        "  Retention:   {} changed, {} deleted\n",
        report.retention.keep_changed, report.retention.keep_deleted
    ));
    out.push_str(&format!(
        "  Schedule:    {}\n",
        report.schedule.as_deref().unwrap_or("(not set)")
    ));
    out.push_str(&format!("  Excludes:    {} global patterns\n", report.global_excludes));
    out.push_str(&format!("  Sources:     {}\n", report.sources.len()));
    for (i, source) in report.sources.iter().enumerate() {
        out.push_str(&format!("    [{}] {}\n", i + 1, source.local_path.display()));
        out.push_str(&format!("        -> {}/\n", source.destination));
        out.push_str(&format!(
            "        Path: {}, {} exclude pattern(s)\n",
            if source.path_exists { "OK" } else { "NOT FOUND" },
            source.excludes
        ));
    }

    section(&mut out, "Last Backup");
    for source in &report.sources {
        out.push_str(&format!("  {}:\n", source.folder));
        history_lines(&mut out, &source.history);
    }

    section(&mut out, "Cron");
    match &report.cron {
        CronState::Active { entries } => {
            for entry in entries {
                out.push_str(&format!("  Active:   Yes\n  Schedule: {}\n", entry.schedule));
            }
        }
        CronState::Inactive => out.push_str("  Active: No (run `versync cron install`)\n"),
        CronState::Unavailable { reason } => out.push_str(&format!("  {}\n", reason)),
    }

    section(&mut out, "rclone");
    match &report.tool.version {
        Some(version) => out.push_str(&format!("  Version: {}\n", version)),
        None => out.push_str("  Version: unknown\n"),
    }
    if report.tool.remotes.is_empty() {
        out.push_str("  Remotes: none configured\n");
    } else {
        out.push_str(&format!("  Remotes: {}\n", report.tool.remotes.join(", ")));
    }
    if let Some(error) = &report.tool.error {
        out.push_str(&format!("  Error:   {}\n", error));
    }

    out
}
