//! File-scanning retrieval over active and rotated log files.

use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::store::read_lines;

use super::entry::RuntimeLogEntry;
use super::writer::{ACTIVE_LOG, LOG_PREFIX};

/// Scan every log file under `logs_dir` and return the entries accepted by
/// `keep`, sorted by timestamp ascending, together with the number of
/// malformed lines skipped.
pub(super) async fn collect_entries<F>(
    logs_dir: &Path,
    keep: F,
) -> Result<(Vec<RuntimeLogEntry>, u64)>
where
    F: Fn(&RuntimeLogEntry) -> bool,
{
    let mut entries = Vec::new();
    let mut malformed: u64 = 0;

    for path in log_files(logs_dir).await? {
        for line in read_lines(&path).await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RuntimeLogEntry>(&line) {
                Ok(entry) => {
                    if keep(&entry) {
                        entries.push(entry);
                    }
                }
                Err(_) => malformed += 1,
            }
        }
    }

    if malformed > 0 {
        debug!(malformed, "skipped malformed runtime log lines");
    }

    entries.sort_by_key(|e| e.timestamp);
    Ok((entries, malformed))
}

/// Rotated files first (oldest naming order), active file last.
async fn log_files(logs_dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut rotated = Vec::new();
    let mut active = None;

    let mut dir = match tokio::fs::read_dir(logs_dir).await {
        Ok(dir) => dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    while let Some(item) = dir.next_entry().await? {
        let name = item.file_name();
        let name = name.to_string_lossy().into_owned();
        if name == ACTIVE_LOG {
            active = Some(item.path());
        } else if name.starts_with(&format!("{LOG_PREFIX}-")) && name.ends_with(".log") {
            rotated.push(item.path());
        }
    }

    rotated.sort();
    if let Some(active) = active {
        rotated.push(active);
    }
    Ok(rotated)
}
