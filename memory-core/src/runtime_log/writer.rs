//! Log file writer: batched appends, rotation, retention.
//!
//! The writer owns the active file and its age marker; entry buffering
//! lives with the background consumer task in the parent module, which
//! hands the writer drained batches.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::LogConfig;
use crate::error::Result;
use crate::store::append_line;

use super::entry::RuntimeLogEntry;

/// Name of the active log file inside the logs directory.
pub(super) const ACTIVE_LOG: &str = "runtime.log";

/// Prefix shared by the active file and rotated files.
pub(super) const LOG_PREFIX: &str = "runtime";

/// Owns the active log file handle state.
pub(super) struct LogWriter {
    logs_dir: PathBuf,
    config: LogConfig,
    /// When the current active file was opened; drives age-based rotation.
    opened_at: Mutex<Option<DateTime<Utc>>>,
}

impl LogWriter {
    pub(super) fn new(logs_dir: PathBuf, config: LogConfig) -> Self {
        Self {
            logs_dir,
            config,
            opened_at: Mutex::new(None),
        }
    }

    pub(super) fn logs_dir(&self) -> &PathBuf {
        &self.logs_dir
    }

    fn active_path(&self) -> PathBuf {
        self.logs_dir.join(ACTIVE_LOG)
    }

    /// Append a drained batch to the active file, one line per entry, then
    /// rotate if the file crossed the configured size or age.
    pub(super) async fn append_batch(&self, entries: &[RuntimeLogEntry]) -> Result<()> {
        if !entries.is_empty() {
            let path = self.active_path();
            {
                let mut opened = self.opened_at.lock().await;
                if opened.is_none() {
                    *opened = Some(Utc::now());
                }
            }
            for entry in entries {
                match serde_json::to_string(entry) {
                    Ok(line) => append_line(&path, &line).await?,
                    Err(e) => debug!(error = %e, "skipping unserializable log entry"),
                }
            }
        }

        self.rotate_if_needed().await
    }

    async fn rotate_if_needed(&self) -> Result<()> {
        let path = self.active_path();
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let oversized = metadata.len() > self.config.max_file_size_bytes;
        let overaged = {
            let opened = self.opened_at.lock().await;
            opened.is_some_and(|t| {
                Utc::now() - t > chrono::Duration::hours(self.config.max_file_age_hours as i64)
            })
        };

        if oversized || overaged {
            self.rotate().await?;
        }
        Ok(())
    }

    /// Rename the active file with a timestamp suffix so the next append
    /// opens a fresh one.
    pub(super) async fn rotate(&self) -> Result<()> {
        let path = self.active_path();
        if tokio::fs::metadata(&path).await.is_err() {
            return Ok(());
        }
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
        let rotated = self.logs_dir.join(format!("{LOG_PREFIX}-{stamp}.log"));
        tokio::fs::rename(&path, &rotated).await?;
        *self.opened_at.lock().await = None;
        Ok(())
    }

    /// Delete rotated files older than `retention_days`. Returns how many
    /// files were removed.
    pub(super) async fn cleanup(&self, retention_days: u32) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention_days));
        let mut removed = 0;

        let mut dir = match tokio::fs::read_dir(&self.logs_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        while let Some(item) = dir.next_entry().await? {
            let name = item.file_name();
            let name = name.to_string_lossy();
            let is_rotated =
                name.starts_with(&format!("{LOG_PREFIX}-")) && name.ends_with(".log");
            if !is_rotated {
                continue;
            }
            let modified: DateTime<Utc> = match item.metadata().await?.modified() {
                Ok(time) => time.into(),
                Err(_) => continue,
            };
            if modified < cutoff {
                if let Err(e) = tokio::fs::remove_file(item.path()).await {
                    debug!(file = %name, error = %e, "failed to delete rotated log file");
                } else {
                    removed += 1;
                }
            }
        }

        Ok(removed)
    }
}
