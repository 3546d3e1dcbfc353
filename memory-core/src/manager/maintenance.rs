//! Retention maintenance: cleanup, archival compression, shutdown.

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::error::Result;

use super::MemoryManager;

/// What a cleanup pass removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanupSummary {
    /// Jobs archived out of the live tree
    pub archived_jobs: usize,
    /// Rotated log files deleted
    pub deleted_log_files: usize,
}

impl MemoryManager {
    /// Run store retention and log retention in parallel. Per-job archive
    /// failures inside the store sweep are logged and skipped there; a
    /// failure of either whole sweep propagates.
    pub async fn cleanup(&self) -> Result<CleanupSummary> {
        self.ensure_initialized()?;

        let (archived, deleted) = futures::join!(
            self.store().cleanup(),
            self.runtime_log().cleanup_logs(self.config().log_retention_days),
        );
        let summary = CleanupSummary {
            archived_jobs: archived?,
            deleted_log_files: deleted?,
        };

        self.runtime_log()
            .info(
                "cleanup_finished",
                json!({
                    "archived_jobs": summary.archived_jobs,
                    "deleted_log_files": summary.deleted_log_files,
                }),
            )
            .await;
        info!(
            archived_jobs = summary.archived_jobs,
            deleted_log_files = summary.deleted_log_files,
            "cleanup finished"
        );
        Ok(summary)
    }

    /// Archive finished jobs older than `days_old`, truncating oversized
    /// context on the way out. Returns the number archived, or 0 without
    /// touching anything when compression is disabled.
    pub async fn compress_old_memories(&self, days_old: u32) -> Result<usize> {
        if !self.config().compression_enabled {
            return Ok(0);
        }
        self.ensure_initialized()?;

        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days_old));
        let archived = self.store().archive_older_than(cutoff).await?;

        self.runtime_log()
            .info(
                "memories_compressed",
                json!({ "archived_jobs": archived, "days_old": days_old }),
            )
            .await;
        Ok(archived)
    }

    /// Drain the runtime log and stop its background flush.
    pub async fn shutdown(&self) {
        self.runtime_log()
            .info("memory_manager_shutdown", json!({}))
            .await;
        self.runtime_log().shutdown().await;
    }
}
