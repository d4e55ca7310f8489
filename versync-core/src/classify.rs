//! Turns combined comparison output into change categories.
//!
//! Marker meanings, as seen from the local side:
//!
//! | Marker | Meaning                        | Category  |
//! |--------|--------------------------------|-----------|
//! | `=`    | identical                      | unchanged |
//! | `*`    | size or hash differs           | changed   |
//! | `+`    | only on the remote             | deleted   |
//! | `-`    | only local                     | new       |
//! | `!`    | comparison error for that path | errors    |

use crate::error::ProviderError;
use crate::layout::RemotePath;
use crate::provider::RemoteProvider;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub changed: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
    pub new: BTreeSet<String>,
    pub errors: BTreeSet<String>,
    /// Count of `=` lines; the paths themselves are not kept.
    pub unchanged: usize,
}

impl Classification {
    /// True when nothing differs between local and remote.
    pub fn is_clean(&self) -> bool {
        self.changed.is_empty() && self.deleted.is_empty() && self.new.is_empty() && self.errors.is_empty()
    }
}

/// Parse combined comparison lines.
///
/// Lines shorter than three characters, lines with an unknown marker and
/// lines whose path is blank are dropped.
pub fn parse_combined<I, S>(lines: I) -> Classification
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result = Classification::default();

    for line in lines {
        let line = line.as_ref();
        if line.chars().count() < 3 {
            continue;
        }

        let mut chars = line.chars();
        let marker = chars.next();
        chars.next();
        let path = chars.as_str().trim();
        if path.is_empty() {
            debug!(line, "Skipping comparison line without a path");
            continue;
        }

        let target = match marker {
            Some('=') => {
                result.unchanged += 1;
                continue;
            }
            Some('*') => &mut result.changed,
            Some('+') => &mut result.deleted,
            Some('-') => &mut result.new,
            Some('!') => &mut result.errors,
            _ => {
                debug!(line, "Skipping comparison line with unknown marker");
                continue;
            }
        };
        target.insert(path.to_string());
    }

    result
}

/// Compare `local` against `remote_current` and classify the differences.
///
/// Only a compare that cannot run (spawn failure, timeout) is an error; the
/// comparison tool's own non-zero exit just means differences were found.
pub async fn classify<P: RemoteProvider>(
    provider: &P,
    local: &Path,
    remote_current: &RemotePath,
    excludes: &[String],
) -> Result<Classification, ProviderError> {
    let lines = provider.compare_combined(local, remote_current, excludes).await?;
    Ok(parse_combined(lines))
}
