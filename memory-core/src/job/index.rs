//! Compact cross-job index records stored in `jobs.ndjson`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{JobMemory, JobStatus};

/// Count summary of a job's recorded entries, kept in sync with the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct JobSummary {
    /// Recorded decisions
    pub decisions: usize,
    /// Recorded gotchas
    pub gotchas: usize,
    /// Gotchas with a resolution marked resolved
    pub resolved_gotchas: usize,
    /// Recorded context entries
    pub context_entries: usize,
    /// Recorded outcomes
    pub outcomes: usize,
    /// Outcomes of type success
    pub successful_outcomes: usize,
    /// Lessons captured across outcomes and decision outcomes
    pub key_learnings: usize,
    /// Gotchas promoted to the knowledge store
    pub promoted_gotchas: usize,
}

/// One line of the global job index. Created when the job is initialized and
/// rewritten in place as the job evolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalJobEntry {
    /// Job id
    pub job_id: String,
    /// External issue id
    pub issue_id: String,
    /// Human-readable title
    pub title: String,
    /// Current job status
    pub status: JobStatus,
    /// Agents seen on the job so far
    pub agent_types: Vec<String>,
    /// When the job started
    pub start_time: DateTime<Utc>,
    /// When the job completed, if it has
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Total duration in minutes, if completed
    #[serde(default)]
    pub duration: Option<u64>,
    /// Whether the job completed successfully
    pub success: bool,
    /// Entry count summary
    pub summary: JobSummary,
}

impl GlobalJobEntry {
    /// Build an index entry from the current state of a job memory.
    #[must_use]
    pub fn from_memory(memory: &JobMemory) -> Self {
        let key_learnings = memory
            .outcomes
            .iter()
            .map(|o| o.lessons.len())
            .chain(
                memory
                    .decisions
                    .iter()
                    .filter_map(|d| d.outcome.as_ref())
                    .map(|o| o.lessons.len()),
            )
            .sum();

        Self {
            job_id: memory.job_id.clone(),
            issue_id: memory.issue_id.clone(),
            title: format!("Job for issue {}", memory.issue_id),
            status: memory.status,
            agent_types: memory.metadata.agent_types.clone(),
            start_time: memory.start_time,
            end_time: memory.end_time,
            duration: memory.metadata.total_duration,
            success: memory.status == JobStatus::Completed,
            summary: JobSummary {
                decisions: memory.decisions.len(),
                gotchas: memory.gotchas.len(),
                resolved_gotchas: memory.gotchas.iter().filter(|g| g.is_resolved()).count(),
                context_entries: memory.context.len(),
                outcomes: memory.outcomes.len(),
                successful_outcomes: memory.successful_outcome_count(),
                key_learnings,
                promoted_gotchas: memory.promoted_gotchas,
            },
        }
    }
}
