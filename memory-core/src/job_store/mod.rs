//! Authoritative persistence of job memories.
//!
//! Every mutating operation runs under a per-job FIFO lock acquired before
//! any I/O and released on completion, including error paths. Reads take no
//! lock; the atomic-rename write discipline guarantees they observe either
//! the pre- or post-write record, never partial bytes. Records with status
//! `running` are cached write-through; completion and archival evict.

mod archive;
mod ids;
mod index;
mod lifecycle;
mod record;

pub use index::JobStatistics;
pub use lifecycle::{AnalyticsPatch, JobMemoryUpdate, MetadataPatch};
pub use record::{NewContext, NewContextUsage, NewDecision, NewGotcha, NewOutcome};

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::config::MemoryConfig;
use crate::error::{Error, Result};
use crate::job::{JobMemory, JobStatus};
use crate::store::{read_json, write_json_atomic, StoreLayout};

/// Disk-backed store of job memories with per-job mutual exclusion.
pub struct JobMemoryStore {
    layout: StoreLayout,
    config: MemoryConfig,
    /// Write-through cache holding only records with status `running`.
    cache: RwLock<HashMap<String, JobMemory>>,
    /// Per-job async mutexes, created lazily, removed on archive.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Serializes rewrites of the global job index.
    pub(crate) index_lock: Mutex<()>,
}

impl JobMemoryStore {
    /// Create a store over the configured base path. No I/O happens here;
    /// directories are created by the façade during initialization.
    #[must_use]
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            layout: StoreLayout::new(config.storage_base_path.clone()),
            config,
            cache: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
            index_lock: Mutex::new(()),
        }
    }

    /// The filesystem layout used by this store.
    #[must_use]
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub(crate) fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Return a running record from cache, else read and parse the live
    /// file, caching it if still running. `Ok(None)` when no live record
    /// exists for the id.
    pub async fn get_job_memory(&self, job_id: &str) -> Result<Option<JobMemory>> {
        {
            let cache = self.cache.read().await;
            if let Some(memory) = cache.get(job_id) {
                return Ok(Some(memory.clone()));
            }
        }

        let Ok(issue_id) = StoreLayout::issue_id_from_job_id(job_id) else {
            return Ok(None);
        };

        let Some(memory) = read_json::<JobMemory>(&self.layout.memory_path(issue_id)).await?
        else {
            return Ok(None);
        };

        // The live file is keyed by issue; a stale id for the same issue
        // must not return the newer job's record.
        if memory.job_id != job_id {
            return Ok(None);
        }

        if memory.status == JobStatus::Running {
            let mut cache = self.cache.write().await;
            cache.insert(job_id.to_string(), memory.clone());
        }

        Ok(Some(memory))
    }

    /// Load a record or fail with `NotFound`.
    pub(crate) async fn load_required(&self, job_id: &str) -> Result<JobMemory> {
        self.get_job_memory(job_id)
            .await?
            .ok_or_else(|| Error::job_not_found(job_id))
    }

    /// Atomically write the record to its live file and update the cache:
    /// running records are cached, anything else is evicted.
    pub(crate) async fn persist(&self, memory: &JobMemory) -> Result<()> {
        debug_assert!(
            agent_types_cover_entries(memory),
            "metadata.agent_types must cover every entry agent"
        );

        let path = self.layout.memory_path(&memory.issue_id);
        write_json_atomic(&path, memory).await?;

        let mut cache = self.cache.write().await;
        if memory.status == JobStatus::Running {
            cache.insert(memory.job_id.clone(), memory.clone());
        } else {
            cache.remove(&memory.job_id);
        }
        Ok(())
    }

    /// The per-job lock, created lazily on first use.
    pub(crate) async fn lock_for(&self, job_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(
            locks
                .entry(job_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Drop the lock map entry for an archived or evicted job.
    pub(crate) async fn remove_lock(&self, job_id: &str) {
        let mut locks = self.locks.lock().await;
        locks.remove(job_id);
    }

    /// Evict a record from the running-job cache.
    pub(crate) async fn evict(&self, job_id: &str) {
        let mut cache = self.cache.write().await;
        cache.remove(job_id);
    }

    /// Advisory entry-count guard; crossing the soft limit only warns.
    pub(crate) fn warn_if_oversized(&self, memory: &JobMemory) {
        if memory.entry_count() > self.config.max_job_memory_size {
            warn!(
                job_id = %memory.job_id,
                entries = memory.entry_count(),
                limit = self.config.max_job_memory_size,
                "job memory exceeds the configured soft size limit"
            );
        }
    }
}

fn agent_types_cover_entries(memory: &JobMemory) -> bool {
    memory
        .agent_types_from_entries()
        .iter()
        .all(|agent| memory.metadata.agent_types.contains(agent))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &std::path::Path) -> JobMemoryStore {
        JobMemoryStore::new(MemoryConfig::with_base_path(dir))
    }

    async fn ready_store(dir: &std::path::Path) -> JobMemoryStore {
        let s = store(dir);
        s.layout().ensure_directories().await.unwrap();
        s
    }

    #[tokio::test]
    async fn test_get_missing_job_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let s = ready_store(dir.path()).await;
        assert!(s.get_job_memory("job-I1-1-abc").await.unwrap().is_none());
        assert!(s.get_job_memory("garbage").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_running_records_are_cached() {
        let dir = tempfile::tempdir().unwrap();
        let s = ready_store(dir.path()).await;
        let memory = s.initialize_job_memory("I1", "S1").await.unwrap();

        // Remove the live file behind the store's back; the cache still
        // serves the running record.
        tokio::fs::remove_file(s.layout().memory_path("I1"))
            .await
            .unwrap();
        let cached = s.get_job_memory(&memory.job_id).await.unwrap();
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn test_stale_job_id_for_same_issue_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let s = ready_store(dir.path()).await;
        let memory = s.initialize_job_memory("I1", "S1").await.unwrap();
        s.evict(&memory.job_id).await;

        assert!(s.get_job_memory("job-I1-0-zzzzzz").await.unwrap().is_none());
        assert!(s.get_job_memory(&memory.job_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lock_map_is_lazy_and_removable() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());

        let a = s.lock_for("job-I1-1-a").await;
        let b = s.lock_for("job-I1-1-a").await;
        assert!(Arc::ptr_eq(&a, &b));

        s.remove_lock("job-I1-1-a").await;
        let c = s.lock_for("job-I1-1-a").await;
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
