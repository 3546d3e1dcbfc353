//! Archival and retention.
//!
//! Archiving moves a job memory out of the live tree into `archive/` as a
//! summarized copy: context content over the truncation limit is cut to the
//! limit plus a trailing `"..."`; everything else is retained verbatim, so
//! the archived record is a strict subset of the live one.

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::job::{JobMemory, JobStatus};
use crate::store::write_json_atomic;

use super::JobMemoryStore;

/// Context content beyond this many characters is truncated on archive.
pub(crate) const ARCHIVE_CONTENT_LIMIT: usize = 500;

/// Produce the archival copy of a record. With truncation disabled the copy
/// is identical.
#[must_use]
pub(crate) fn summarize_for_archive(memory: &JobMemory, truncate: bool) -> JobMemory {
    let mut archived = memory.clone();
    if truncate {
        for entry in &mut archived.context {
            if entry.content.chars().count() > ARCHIVE_CONTENT_LIMIT {
                let mut cut: String = entry.content.chars().take(ARCHIVE_CONTENT_LIMIT).collect();
                cut.push_str("...");
                entry.content = cut;
            }
        }
    }
    archived
}

impl JobMemoryStore {
    /// Archive one job: write the summarized copy, delete the live file,
    /// attempt to remove the now-empty issue directory, and drop the cache
    /// and lock entries.
    pub async fn archive_job_memory(&self, job_id: &str) -> Result<()> {
        {
            let lock = self.lock_for(job_id).await;
            let _guard = lock.lock().await;

            let memory = self.load_required(job_id).await?;
            let archived = summarize_for_archive(&memory, self.config().compression_enabled);
            write_json_atomic(&self.layout().archive_path(job_id), &archived).await?;

            let issue_id = &memory.issue_id;
            tokio::fs::remove_file(self.layout().memory_path(issue_id)).await?;

            // Best effort: the logs subdirectory and the issue directory may
            // be non-empty, in which case they stay.
            let _ = tokio::fs::remove_dir(self.layout().issue_logs_dir(issue_id)).await;
            let _ = tokio::fs::remove_dir(self.layout().issue_dir(issue_id)).await;

            self.evict(job_id).await;
        }
        self.remove_lock(job_id).await;
        debug!(job_id, "archived job memory");
        Ok(())
    }

    /// Archive every finished job whose `end_time` is older than the
    /// configured retention window, then rewrite the index to contain only
    /// the remaining jobs. Per-job failures are logged and skipped; the
    /// sweep never aborts on a single failure. Returns how many jobs were
    /// archived.
    pub async fn cleanup(&self) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(self.config().retention_days));
        self.archive_older_than(cutoff).await
    }

    /// Archive every finished job whose `end_time` predates `cutoff` and
    /// drop the archived jobs from the index.
    pub(crate) async fn archive_older_than(
        &self,
        cutoff: chrono::DateTime<Utc>,
    ) -> Result<usize> {
        let entries = self.read_index().await?;

        let mut archived_ids = Vec::new();
        for entry in &entries {
            if entry.status == JobStatus::Running {
                continue;
            }
            let Some(end_time) = entry.end_time else {
                continue;
            };
            if end_time >= cutoff {
                continue;
            }

            match self.archive_job_memory(&entry.job_id).await {
                Ok(()) => archived_ids.push(entry.job_id.clone()),
                // Live record already gone: the job is no longer live, so
                // drop its index entry as well.
                Err(Error::NotFound(_)) => {
                    debug!(job_id = %entry.job_id, "cleanup found no live record; dropping index entry");
                    archived_ids.push(entry.job_id.clone());
                }
                Err(e) => {
                    warn!(job_id = %entry.job_id, error = %e, "cleanup failed to archive job; skipping");
                }
            }
        }

        if !archived_ids.is_empty() {
            self.retain_index_entries(|e| !archived_ids.contains(&e.job_id))
                .await?;
        }
        Ok(archived_ids.len())
    }

    /// Read an archived record. `Ok(None)` when the job was never archived.
    pub async fn get_archived_memory(&self, job_id: &str) -> Result<Option<JobMemory>> {
        crate::store::read_json(&self.layout().archive_path(job_id)).await
    }
}
