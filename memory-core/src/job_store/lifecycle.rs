//! Job lifecycle operations: initialization, targeted updates, completion.

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::job::{
    ComplexityLevel, GlobalJobEntry, JobAnalytics, JobMemory, JobStatus, PatternMatch,
};

use super::ids::generate_job_id;
use super::record::NewOutcome;
use super::JobMemoryStore;

/// Targeted metadata changes applied by `update_job_memory`. Scalars
/// replace, lists merge without duplicates.
#[derive(Debug, Clone, Default)]
pub struct MetadataPatch {
    /// Replace the complexity classification
    pub complexity: Option<ComplexityLevel>,
    /// Replace the priority label
    pub priority: Option<String>,
    /// Tags to merge in
    pub tags: Option<Vec<String>>,
    /// Related issue ids to merge in
    pub related_issues: Option<Vec<String>>,
    /// Child job ids to merge in
    pub child_jobs: Option<Vec<String>>,
}

/// Targeted analytics changes applied by `update_job_memory`. Each set
/// field replaces its counterpart.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsPatch {
    /// Replace the pattern match list
    pub pattern_matches: Option<Vec<PatternMatch>>,
    /// Replace the efficiency metrics
    pub efficiency_metrics: Option<crate::job::EfficiencyMetrics>,
    /// Replace the learning score
    pub learning_score: Option<f32>,
    /// Replace the reuse score
    pub reuse_score: Option<f32>,
    /// Replace the innovation score
    pub innovation_score: Option<f32>,
}

impl AnalyticsPatch {
    /// Patch that replaces the whole analytics block.
    #[must_use]
    pub fn replace(analytics: JobAnalytics) -> Self {
        Self {
            pattern_matches: Some(analytics.pattern_matches),
            efficiency_metrics: Some(analytics.efficiency_metrics),
            learning_score: Some(analytics.learning_score),
            reuse_score: Some(analytics.reuse_score),
            innovation_score: Some(analytics.innovation_score),
        }
    }
}

/// Update request for `update_job_memory`. A set `job_id` differing from
/// the record's id is rejected with `Conflict`.
#[derive(Debug, Clone, Default)]
pub struct JobMemoryUpdate {
    /// Must equal the record's id when set; present so that id tampering
    /// is detectable rather than silently ignored
    pub job_id: Option<String>,
    /// Metadata changes
    pub metadata: Option<MetadataPatch>,
    /// Analytics changes
    pub analytics: Option<AnalyticsPatch>,
    /// Count of gotchas promoted to the knowledge store
    pub promoted_gotchas: Option<usize>,
}

impl JobMemoryStore {
    /// Create and persist a fresh running record for an issue, and append
    /// its entry to the global job index.
    ///
    /// Issue ids may not be empty or contain `-` (the job id encoding
    /// reserves it) or path separators.
    pub async fn initialize_job_memory(
        &self,
        issue_id: &str,
        session_id: &str,
    ) -> Result<JobMemory> {
        validate_issue_id(issue_id)?;

        tokio::fs::create_dir_all(self.layout().issue_logs_dir(issue_id)).await?;

        // The suffix is random, not monotonic; re-roll on the unlikely
        // collision with an archived id.
        let mut job_id = generate_job_id(issue_id);
        for _ in 0..3 {
            if tokio::fs::try_exists(self.layout().archive_path(&job_id))
                .await
                .unwrap_or(false)
            {
                job_id = generate_job_id(issue_id);
            } else {
                break;
            }
        }

        let memory = JobMemory::new(job_id, issue_id.to_string(), session_id.to_string());
        self.persist(&memory).await?;

        let entry = GlobalJobEntry::from_memory(&memory);
        self.append_index_entry(&entry).await?;

        info!(job_id = %memory.job_id, issue_id, "initialized job memory");
        Ok(memory)
    }

    /// Apply a targeted update under the per-job lock. Metadata lists merge,
    /// scalars replace; analytics fields replace; `job_id` is immutable.
    pub async fn update_job_memory(
        &self,
        job_id: &str,
        updates: JobMemoryUpdate,
    ) -> Result<JobMemory> {
        let lock = self.lock_for(job_id).await;
        let _guard = lock.lock().await;

        let mut memory = self.load_required(job_id).await?;

        if let Some(requested_id) = &updates.job_id {
            if requested_id != job_id {
                return Err(Error::Conflict(format!(
                    "job_id is immutable: {job_id} cannot become {requested_id}"
                )));
            }
        }

        if let Some(patch) = updates.metadata {
            if let Some(complexity) = patch.complexity {
                memory.metadata.complexity = complexity;
            }
            if let Some(priority) = patch.priority {
                memory.metadata.priority = priority;
            }
            merge_into(&mut memory.metadata.tags, patch.tags);
            merge_into(&mut memory.metadata.related_issues, patch.related_issues);
            merge_into(&mut memory.metadata.child_jobs, patch.child_jobs);
        }

        if let Some(patch) = updates.analytics {
            if let Some(matches) = patch.pattern_matches {
                memory.analytics.pattern_matches = matches;
            }
            if let Some(metrics) = patch.efficiency_metrics {
                memory.analytics.efficiency_metrics = metrics;
            }
            if let Some(score) = patch.learning_score {
                memory.analytics.learning_score = score.clamp(0.0, 1.0);
            }
            if let Some(score) = patch.reuse_score {
                memory.analytics.reuse_score = score.clamp(0.0, 1.0);
            }
            if let Some(score) = patch.innovation_score {
                memory.analytics.innovation_score = score.clamp(0.0, 1.0);
            }
        }

        if let Some(promoted) = updates.promoted_gotchas {
            memory.promoted_gotchas = promoted;
        }

        self.persist(&memory).await?;
        self.update_index_entry(&memory).await?;
        Ok(memory)
    }

    /// Finalize a running job: append the final outcome, set the end time
    /// and duration, classify the status, update the global index, and
    /// evict the record from the cache.
    ///
    /// The job completes as `Completed` iff successful outcomes strictly
    /// outnumber failures; a tie counts as `Failed`.
    pub async fn complete_job_memory(
        &self,
        job_id: &str,
        final_outcome: NewOutcome,
    ) -> Result<JobMemory> {
        let lock = self.lock_for(job_id).await;
        let _guard = lock.lock().await;

        let mut memory = self.load_required(job_id).await?;
        if memory.is_complete() {
            return Err(Error::Conflict(format!("job {job_id} is already complete")));
        }

        memory.metadata.track_agent(&final_outcome.agent_type);
        memory.outcomes.push(super::record::build_outcome(final_outcome));

        let end_time = Utc::now();
        let minutes = (end_time - memory.start_time).num_minutes().max(1);
        memory.end_time = Some(end_time);
        memory.metadata.total_duration = Some(minutes as u64);
        memory.status = if memory.successful_outcome_count() > memory.failed_outcome_count() {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };

        self.persist(&memory).await?;
        self.update_index_entry(&memory).await?;

        debug!(
            job_id,
            status = %memory.status,
            duration_minutes = minutes,
            "completed job memory"
        );
        Ok(memory)
    }
}

fn validate_issue_id(issue_id: &str) -> Result<()> {
    if issue_id.is_empty() {
        return Err(Error::Conflict("issue id must not be empty".to_string()));
    }
    if issue_id.contains('-') {
        return Err(Error::Conflict(format!(
            "issue id {issue_id} must not contain '-': it is reserved by the job id encoding"
        )));
    }
    if issue_id.contains('/') || issue_id.contains('\\') || issue_id.contains("..") {
        return Err(Error::Conflict(format!(
            "issue id {issue_id} must not contain path separators"
        )));
    }
    Ok(())
}

fn merge_into(target: &mut Vec<String>, additions: Option<Vec<String>>) {
    if let Some(additions) = additions {
        for item in additions {
            if !target.contains(&item) {
                target.push(item);
            }
        }
    }
}
