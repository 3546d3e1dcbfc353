//! Global job index (`jobs.ndjson`) maintenance and queries.
//!
//! Creation appends one line per job; every later change to an entry
//! rewrites the whole file through the atomic-replace primitive, which makes
//! an update a synchronization point across all readers of the index.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::job::{GlobalJobEntry, JobMemory, JobStatus};
use crate::store::{append_line, read_lines, write_string_atomic};

use super::JobMemoryStore;

/// Corpus-level counts derived from the global job index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JobStatistics {
    /// Jobs ever indexed (live entries only; archived jobs drop out)
    pub total_jobs: usize,
    /// Jobs still running
    pub running_jobs: usize,
    /// Jobs completed successfully
    pub completed_jobs: usize,
    /// Jobs that finished failed
    pub failed_jobs: usize,
    /// Decisions recorded across all indexed jobs
    pub total_decisions: usize,
    /// Gotchas recorded across all indexed jobs
    pub total_gotchas: usize,
    /// Outcomes recorded across all indexed jobs
    pub total_outcomes: usize,
    /// Resolved gotchas over total gotchas, 0 with none
    pub gotcha_resolution_rate: f32,
    /// Mean duration in minutes over finished jobs, 0 with none
    pub average_duration_minutes: f32,
}

impl JobMemoryStore {
    /// All entries of the global job index, in creation order.
    pub async fn get_global_job_log(&self) -> Result<Vec<GlobalJobEntry>> {
        self.read_index().await
    }

    /// Index entries for one issue.
    pub async fn get_jobs_by_issue(&self, issue_id: &str) -> Result<Vec<GlobalJobEntry>> {
        let entries = self.read_index().await?;
        Ok(entries.into_iter().filter(|e| e.issue_id == issue_id).collect())
    }

    /// Index entries whose jobs involved the given agent.
    pub async fn get_jobs_by_agent(&self, agent_type: &str) -> Result<Vec<GlobalJobEntry>> {
        let entries = self.read_index().await?;
        Ok(entries
            .into_iter()
            .filter(|e| e.agent_types.iter().any(|a| a == agent_type))
            .collect())
    }

    /// Corpus-level statistics over the index.
    pub async fn get_job_statistics(&self) -> Result<JobStatistics> {
        let entries = self.read_index().await?;

        let mut stats = JobStatistics {
            total_jobs: entries.len(),
            ..JobStatistics::default()
        };
        let mut resolved = 0usize;
        let mut finished_minutes = 0u64;
        let mut finished = 0usize;

        for entry in &entries {
            match entry.status {
                JobStatus::Running => stats.running_jobs += 1,
                JobStatus::Completed => stats.completed_jobs += 1,
                JobStatus::Failed => stats.failed_jobs += 1,
            }
            stats.total_decisions += entry.summary.decisions;
            stats.total_gotchas += entry.summary.gotchas;
            stats.total_outcomes += entry.summary.outcomes;
            resolved += entry.summary.resolved_gotchas;
            if let Some(duration) = entry.duration {
                finished_minutes += duration;
                finished += 1;
            }
        }

        if stats.total_gotchas > 0 {
            stats.gotcha_resolution_rate = resolved as f32 / stats.total_gotchas as f32;
        }
        if finished > 0 {
            stats.average_duration_minutes = finished_minutes as f32 / finished as f32;
        }
        Ok(stats)
    }

    pub(crate) async fn read_index(&self) -> Result<Vec<GlobalJobEntry>> {
        // Reads briefly serialize with index writers so a line mid-append is
        // never observed half-written.
        let _guard = self.index_lock.lock().await;
        self.read_index_unlocked().await
    }

    /// Append a freshly created job's entry.
    pub(crate) async fn append_index_entry(&self, entry: &GlobalJobEntry) -> Result<()> {
        let _guard = self.index_lock.lock().await;
        let line = serde_json::to_string(entry)?;
        append_line(&self.layout().index_path(), &line).await
    }

    /// Rebuild the entry for one job from its current record and rewrite
    /// the index file in place, preserving creation order.
    pub(crate) async fn update_index_entry(&self, memory: &JobMemory) -> Result<()> {
        let fresh = GlobalJobEntry::from_memory(memory);
        let _guard = self.index_lock.lock().await;

        let mut entries = self.read_index_unlocked().await?;
        match entries.iter_mut().find(|e| e.job_id == memory.job_id) {
            Some(slot) => *slot = fresh,
            None => entries.push(fresh),
        }
        self.rewrite_index_unlocked(&entries).await
    }

    /// Rewrite the index keeping only entries accepted by `keep`.
    pub(crate) async fn retain_index_entries<F>(&self, keep: F) -> Result<()>
    where
        F: Fn(&GlobalJobEntry) -> bool,
    {
        let _guard = self.index_lock.lock().await;
        let entries = self.read_index_unlocked().await?;
        let remaining: Vec<GlobalJobEntry> = entries.into_iter().filter(|e| keep(e)).collect();
        self.rewrite_index_unlocked(&remaining).await
    }

    async fn read_index_unlocked(&self) -> Result<Vec<GlobalJobEntry>> {
        // Same parse as read_index; the caller already holds index_lock.
        let path = self.layout().index_path();
        let mut entries = Vec::new();
        for line in read_lines(&path).await? {
            if line.trim().is_empty() {
                continue;
            }
            let entry =
                serde_json::from_str::<GlobalJobEntry>(&line).map_err(|source| Error::Corrupt {
                    path: path.display().to_string(),
                    source,
                })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn rewrite_index_unlocked(&self, entries: &[GlobalJobEntry]) -> Result<()> {
        let mut contents = String::new();
        for entry in entries {
            contents.push_str(&serde_json::to_string(entry)?);
            contents.push('\n');
        }
        write_string_atomic(&self.layout().index_path(), &contents).await
    }
}
