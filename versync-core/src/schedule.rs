//! Crontab entry management.
//!
//! The crontab text is read and written by the caller; everything here is
//! a pure transformation so it can be tested without a cron daemon.

use crate::error::SyncError;
use serde::Serialize;
use std::path::Path;

/// Trailing comment identifying lines owned by this tool.
pub const CRON_TAG: &str = "# versync";

const MACROS: [&str; 8] = [
    "@reboot", "@yearly", "@annually", "@monthly", "@weekly", "@daily", "@midnight", "@hourly",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CronEntry {
    pub schedule: String,
    pub command: String,
}

/// Accept a five-field expression or one of the `@` shorthands.
pub fn validate_cron(expr: &str) -> Result<(), SyncError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    let valid = match fields.as_slice() {
        [single] if single.starts_with('@') => MACROS.contains(single),
        five if five.len() == 5 => five.iter().all(|f| {
            f.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '*' | ',' | '-' | '/'))
        }),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SyncError::Config(format!("invalid cron schedule '{}'", expr)))
    }
}

fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | ':' | '='))
    {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// Command line run by cron: a backup with the given config, output
/// appended to `log`.
pub fn build_command(exe: &Path, config: &Path, log: &Path) -> String {
    format!(
        "{} --config {} backup >> {} 2>&1",
        shell_quote(&exe.to_string_lossy()),
        shell_quote(&config.to_string_lossy()),
        shell_quote(&log.to_string_lossy()),
    )
}

pub fn render_entry(schedule: &str, command: &str) -> String {
    format!("{} {} {}", schedule.trim(), command, CRON_TAG)
}

fn is_ours(line: &str) -> bool {
    line.trim_end().ends_with(CRON_TAG)
}

fn parse_entry(line: &str) -> Option<CronEntry> {
    let body = line.trim_end().strip_suffix(CRON_TAG)?.trim();
    let fields: Vec<&str> = body.split_whitespace().collect();
    let n = if fields.first()?.starts_with('@') { 1 } else { 5 };
    if fields.len() <= n {
        return None;
    }
    Some(CronEntry {
        schedule: fields[..n].join(" "),
        command: fields[n..].join(" "),
    })
}

/// Entries in `crontab` that belong to this tool.
pub fn find_entries(crontab: &str) -> Vec<CronEntry> {
    crontab
        .lines()
        .filter(|l| is_ours(l))
        .filter_map(parse_entry)
        .collect()
}

/// Replace any existing entries of ours with `entry`, keeping everything
/// else untouched.
pub fn install_entry(crontab: &str, entry: &str) -> String {
    let (mut out, _) = remove_entries(crontab);
    out.push_str(entry);
    out.push('\n');
    out
}

/// Drop our entries; returns the new text and how many lines were removed.
pub fn remove_entries(crontab: &str) -> (String, usize) {
    let mut removed = 0;
    let mut out = String::with_capacity(crontab.len());
    for line in crontab.lines() {
        if is_ours(line) {
            removed += 1;
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    (out, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_cron() {
        assert!(validate_cron("0 */6 * * *").is_ok());
        assert!(validate_cron("30 2 * * mon-fri").is_ok());
        assert!(validate_cron("@daily").is_ok());
        assert!(validate_cron("@sometimes").is_err());
        assert!(validate_cron("0 2 * *").is_err());
        assert!(validate_cron("0 2 * * * rm").is_err());
        assert!(validate_cron("0 2 * * ;").is_err());
    }

    #[test]
    fn test_build_command_quotes_paths() {
        let cmd = build_command(
            Path::new("/usr/local/bin/versync"),
            Path::new("/home/me/my config.toml"),
            Path::new("/tmp/versync.log"),
        );
        assert_eq!(
            cmd,
            "/usr/local/bin/versync --config '/home/me/my config.toml' backup >> /tmp/versync.log 2>&1"
        );
    }

    #[test]
    fn test_install_replaces_previous_entry() {
        let existing = "MAILTO=me\n0 1 * * * /usr/bin/other\n0 3 * * * old-cmd # versync\n";
        let entry = render_entry("0 */6 * * *", "new-cmd");

        let updated = install_entry(existing, &entry);
        assert_eq!(
            updated,
            "MAILTO=me\n0 1 * * * /usr/bin/other\n0 */6 * * * new-cmd # versync\n"
        );

        // installing twice keeps a single entry
        assert_eq!(install_entry(&updated, &entry), updated);
    }

    #[test]
    fn test_find_and_remove_entries() {
        let crontab = "0 1 * * * other\n@daily versync backup # versync\n";

        assert_eq!(
            find_entries(crontab),
            vec![CronEntry {
                schedule: "@daily".into(),
                command: "versync backup".into(),
            }]
        );

        let (rest, removed) = remove_entries(crontab);
        assert_eq!(removed, 1);
        assert_eq!(rest, "0 1 * * * other\n");
        assert!(find_entries(&rest).is_empty());
    }
}
