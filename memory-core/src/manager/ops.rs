//! Instrumented delegation of store and analytics operations.
//!
//! Every mutating call emits an `info` event on entry and an `error` event
//! with the message and elapsed time on failure, stitched together by one
//! correlation id. Crossing the configured operation-time threshold emits a
//! warning but never fails the operation.

use std::future::Future;
use std::time::Instant;

use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::analytics::{
    AgentPerformance, JobPattern, MemoryInsights, OutcomePrediction, PatternQuery, SimilarJob,
    TrendReport,
};
use crate::error::Result;
use crate::job::{GlobalJobEntry, JobMemory, PatternMatch, TimeRange};
use crate::job_store::{
    JobMemoryUpdate, JobStatistics, NewContext, NewContextUsage, NewDecision, NewGotcha,
    NewOutcome,
};
use crate::runtime_log::LogLevel;

use super::MemoryManager;

impl MemoryManager {
    /// Create a new job memory for an issue.
    pub async fn initialize_job_memory(
        &self,
        issue_id: &str,
        session_id: &str,
    ) -> Result<JobMemory> {
        self.run_mutation(
            "job_memory_initialize",
            None,
            self.store().initialize_job_memory(issue_id, session_id),
        )
        .await
    }

    /// Fetch a job memory; `Ok(None)` when no live record exists.
    pub async fn get_job_memory(&self, job_id: &str) -> Result<Option<JobMemory>> {
        self.store().get_job_memory(job_id).await
    }

    /// Apply a targeted update to a job memory.
    pub async fn update_job_memory(
        &self,
        job_id: &str,
        updates: JobMemoryUpdate,
    ) -> Result<JobMemory> {
        self.run_mutation(
            "job_memory_update",
            Some(job_id),
            self.store().update_job_memory(job_id, updates),
        )
        .await
    }

    /// Record a decision.
    pub async fn record_decision(&self, job_id: &str, draft: NewDecision) -> Result<JobMemory> {
        self.run_mutation(
            "decision_record",
            Some(job_id),
            self.store().record_decision(job_id, draft),
        )
        .await
    }

    /// Record a gotcha.
    pub async fn record_gotcha(&self, job_id: &str, draft: NewGotcha) -> Result<JobMemory> {
        self.run_mutation(
            "gotcha_record",
            Some(job_id),
            self.store().record_gotcha(job_id, draft),
        )
        .await
    }

    /// Record a consulted context artifact.
    pub async fn record_context(&self, job_id: &str, draft: NewContext) -> Result<JobMemory> {
        self.run_mutation(
            "context_record",
            Some(job_id),
            self.store().record_context(job_id, draft),
        )
        .await
    }

    /// Record an intermediate outcome.
    pub async fn record_outcome(&self, job_id: &str, draft: NewOutcome) -> Result<JobMemory> {
        self.run_mutation(
            "outcome_record",
            Some(job_id),
            self.store().record_outcome(job_id, draft),
        )
        .await
    }

    /// Resolve a recorded gotcha.
    pub async fn resolve_gotcha(
        &self,
        job_id: &str,
        gotcha_id: &str,
        resolution: crate::job::GotchaResolution,
    ) -> Result<JobMemory> {
        self.run_mutation(
            "gotcha_resolve",
            Some(job_id),
            self.store().resolve_gotcha(job_id, gotcha_id, resolution),
        )
        .await
    }

    /// Attach a retrospective outcome to a decision.
    pub async fn update_decision_outcome(
        &self,
        job_id: &str,
        decision_id: &str,
        outcome: crate::job::DecisionOutcome,
    ) -> Result<JobMemory> {
        self.run_mutation(
            "decision_outcome_update",
            Some(job_id),
            self.store()
                .update_decision_outcome(job_id, decision_id, outcome),
        )
        .await
    }

    /// Track how a context artifact was used.
    pub async fn track_context_usage(
        &self,
        job_id: &str,
        context_id: &str,
        usage: NewContextUsage,
    ) -> Result<JobMemory> {
        self.run_mutation(
            "context_usage_track",
            Some(job_id),
            self.store().track_context_usage(job_id, context_id, usage),
        )
        .await
    }

    /// Archive one job memory out of the live tree.
    pub async fn archive_job_memory(&self, job_id: &str) -> Result<()> {
        self.run_mutation(
            "job_memory_archive",
            Some(job_id),
            self.store().archive_job_memory(job_id),
        )
        .await
    }

    /// The global job index, in creation order.
    pub async fn get_global_job_log(&self) -> Result<Vec<GlobalJobEntry>> {
        self.store().get_global_job_log().await
    }

    /// Index entries for one issue.
    pub async fn get_jobs_by_issue(&self, issue_id: &str) -> Result<Vec<GlobalJobEntry>> {
        self.store().get_jobs_by_issue(issue_id).await
    }

    /// Index entries for one agent.
    pub async fn get_jobs_by_agent(&self, agent_type: &str) -> Result<Vec<GlobalJobEntry>> {
        self.store().get_jobs_by_agent(agent_type).await
    }

    /// Corpus-level statistics over the index.
    pub async fn get_job_statistics(&self) -> Result<JobStatistics> {
        self.store().get_job_statistics().await
    }

    /// Full analytics block for one job.
    pub async fn calculate_job_analytics(&self, job_id: &str) -> Result<crate::job::JobAnalytics> {
        self.analytics().calculate_job_analytics(job_id).await
    }

    /// Composite efficiency for one job.
    pub async fn calculate_job_efficiency(&self, job_id: &str) -> Result<f32> {
        self.analytics().calculate_job_efficiency(job_id).await
    }

    /// Jobs similar to the given one.
    pub async fn find_similar_jobs(&self, job_id: &str) -> Result<Vec<SimilarJob>> {
        self.analytics().find_similar_jobs(job_id).await
    }

    /// Search mined cross-job patterns.
    pub async fn search_similar_patterns(&self, query: &PatternQuery) -> Result<Vec<PatternMatch>> {
        self.analytics().search_similar_patterns(query).await
    }

    /// Insight bundle for one job.
    pub async fn get_memory_insights(&self, job_id: &str) -> Result<MemoryInsights> {
        self.analytics().get_memory_insights(job_id).await
    }

    /// Aggregate trends over a time range.
    pub async fn analyze_trends(&self, range: TimeRange) -> Result<TrendReport> {
        self.analytics().analyze_trends(range).await
    }

    /// Predict the outcome of an in-flight job.
    pub async fn predict_job_outcome(&self, partial: &JobMemory) -> Result<OutcomePrediction> {
        self.analytics().predict_job_outcome(partial).await
    }

    /// Performance profile for one agent.
    pub async fn analyze_agent_performance(&self, agent_type: &str) -> Result<AgentPerformance> {
        self.analytics().analyze_agent_performance(agent_type).await
    }

    /// Ranked profiles for every agent in the corpus.
    pub async fn compare_agent_effectiveness(&self) -> Result<Vec<AgentPerformance>> {
        self.analytics().compare_agent_effectiveness().await
    }

    /// Mine success patterns from the given jobs.
    #[must_use]
    pub fn identify_success_patterns(&self, jobs: &[JobMemory]) -> Vec<JobPattern> {
        self.analytics().identify_success_patterns(jobs)
    }

    /// Mine failure patterns from the given jobs.
    #[must_use]
    pub fn identify_failure_patterns(&self, jobs: &[JobMemory]) -> Vec<JobPattern> {
        self.analytics().identify_failure_patterns(jobs)
    }

    /// Wrap a mutating store call with entry/error events and the
    /// operation-time threshold warning.
    pub(super) async fn run_mutation<T, F>(
        &self,
        event: &str,
        job_id: Option<&str>,
        op: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.ensure_initialized()?;

        let correlation_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        self.runtime_log()
            .log_with(
                LogLevel::Info,
                &format!("{event}_started"),
                json!({ "job_id": job_id }),
                None,
                Some(correlation_id.clone()),
            )
            .await;

        match op.await {
            Ok(value) => {
                let elapsed = started.elapsed().as_millis() as u64;
                self.warn_if_slow(event, job_id, elapsed).await;
                Ok(value)
            }
            Err(e) => {
                let elapsed = started.elapsed().as_millis() as u64;
                self.runtime_log()
                    .log_with(
                        LogLevel::Error,
                        &format!("{event}_failed"),
                        json!({
                            "job_id": job_id,
                            "error": e.to_string(),
                            "duration": elapsed,
                        }),
                        None,
                        Some(correlation_id),
                    )
                    .await;
                Err(e)
            }
        }
    }

    pub(super) async fn warn_if_slow(&self, event: &str, job_id: Option<&str>, elapsed_ms: u64) {
        let threshold = self.config().performance_thresholds.memory_operation_time_ms;
        if elapsed_ms > threshold {
            warn!(
                event,
                job_id,
                elapsed_ms,
                threshold_ms = threshold,
                "memory operation exceeded its time threshold"
            );
            self.runtime_log()
                .warn(
                    &format!("{event}_slow"),
                    json!({
                        "job_id": job_id,
                        "duration": elapsed_ms,
                        "threshold_ms": threshold,
                    }),
                )
                .await;
        }
    }
}
