//! Job memory data model.
//!
//! A [`JobMemory`] is the complete record of one unit of work tied to an
//! external issue: the decisions taken, pitfalls hit, artifacts consulted,
//! and graded outcomes, plus metadata and derived analytics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod entries;
pub mod index;
pub mod metadata;

pub use entries::{
    CodeChanges, ContextEntry, ContextUsage, Decision, DecisionMetrics, DecisionOption,
    DecisionOutcome, Gotcha, GotchaResolution, GotchaSeverity, Outcome, OutcomeMetrics,
    OutcomeType, QualityMetrics, KNOWLEDGE_RETRIEVAL,
};
pub use index::{GlobalJobEntry, JobSummary};
pub use metadata::{
    ComplexityLevel, EfficiencyMetrics, JobAnalytics, JobMetadata, PatternKind, PatternMatch,
};

/// Lifecycle state of a job memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is in flight; the record is mutable and cached
    #[default]
    Running,
    /// Job finished with successful outcomes strictly outnumbering failures
    Completed,
    /// Job finished without a strict success majority
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Inclusive time range used by log filters and trend analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Range start (inclusive)
    pub start: DateTime<Utc>,
    /// Range end (inclusive)
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Whether the instant falls inside the range.
    #[must_use]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }
}

/// The root record for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMemory {
    /// Opaque, globally unique id; immutable once assigned
    pub job_id: String,
    /// External issue reference; multiple jobs may share one
    pub issue_id: String,
    /// Session the job ran under
    pub session_id: String,
    /// Lifecycle state
    pub status: JobStatus,
    /// Set at creation
    pub start_time: DateTime<Utc>,
    /// Set on completion; absent while running
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Decisions, insertion order
    pub decisions: Vec<Decision>,
    /// Gotchas, insertion order
    pub gotchas: Vec<Gotcha>,
    /// Context entries, insertion order
    pub context: Vec<ContextEntry>,
    /// Outcomes, insertion order
    pub outcomes: Vec<Outcome>,
    /// Job-level metadata
    pub metadata: JobMetadata,
    /// Derived analytics, written back after completion
    pub analytics: JobAnalytics,
    /// Gotchas forwarded to the knowledge store for this job
    #[serde(default)]
    pub promoted_gotchas: usize,
}

impl JobMemory {
    /// Build an empty running record. Ids are assigned by the store.
    #[must_use]
    pub fn new(job_id: String, issue_id: String, session_id: String) -> Self {
        Self {
            job_id,
            issue_id,
            session_id,
            status: JobStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            decisions: Vec::new(),
            gotchas: Vec::new(),
            context: Vec::new(),
            outcomes: Vec::new(),
            metadata: JobMetadata::default(),
            analytics: JobAnalytics::default(),
            promoted_gotchas: 0,
        }
    }

    /// Whether the job has been finalized.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status != JobStatus::Running
    }

    /// Count of outcomes graded as success.
    #[must_use]
    pub fn successful_outcome_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome_type == OutcomeType::Success)
            .count()
    }

    /// Count of outcomes graded as failure.
    #[must_use]
    pub fn failed_outcome_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome_type == OutcomeType::Failure)
            .count()
    }

    /// Total entries across all four collections.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.decisions.len() + self.gotchas.len() + self.context.len() + self.outcomes.len()
    }

    /// Distinct agent types referenced by any entry, first-seen order.
    ///
    /// The store keeps `metadata.agent_types` equal to this at all times;
    /// the helper exists so invariant checks and tests can recompute it.
    #[must_use]
    pub fn agent_types_from_entries(&self) -> Vec<String> {
        let mut seen = Vec::new();
        let all = self
            .decisions
            .iter()
            .map(|d| d.agent_type.as_str())
            .chain(self.gotchas.iter().map(|g| g.agent_type.as_str()))
            .chain(self.context.iter().map(|c| c.agent_type.as_str()))
            .chain(self.outcomes.iter().map(|o| o.agent_type.as_str()));
        for agent in all {
            if !seen.iter().any(|s: &String| s == agent) {
                seen.push(agent.to_string());
            }
        }
        seen
    }

    /// Lessons captured anywhere on the job.
    #[must_use]
    pub fn lesson_count(&self) -> usize {
        let outcome_lessons: usize = self.outcomes.iter().map(|o| o.lessons.len()).sum();
        let decision_lessons: usize = self
            .decisions
            .iter()
            .filter_map(|d| d.outcome.as_ref())
            .map(|o| o.lessons.len())
            .sum();
        let prevention_steps: usize = self
            .gotchas
            .iter()
            .filter_map(|g| g.resolution.as_ref())
            .map(|r| r.prevention_steps.len())
            .sum();
        outcome_lessons + decision_lessons + prevention_steps
    }
}
