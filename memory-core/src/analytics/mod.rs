//! Cross-job analytics engine.
//!
//! Derives insights from persisted job memories: per-job scores, cross-job
//! patterns, similarity, trend aggregation, outcome prediction, and agent
//! comparison. Every method is read-only with respect to the store; the
//! façade persists derived analytics back through the store's own
//! operations. Single-job calculations log a warning when they exceed the
//! configured time threshold but never fail because of it.

mod agents;
mod insights;
mod patterns;
mod prediction;
mod scores;
mod similarity;
mod trends;

pub use agents::AgentPerformance;
pub use insights::{
    InsightMetrics, InsightPatterns, InsightRecommendations, InsightSummary, MemoryInsights,
};
pub use patterns::{
    identify_failure_patterns, identify_success_patterns, JobPattern, PatternQuery,
    MIN_PATTERN_SUPPORT,
};
pub use prediction::OutcomePrediction;
pub use similarity::{SimilarJob, SIMILARITY_THRESHOLD};
pub use trends::{CategoryCount, TrendReport};

use std::sync::Arc;
use std::time::Instant;

use tracing::warn;

use crate::config::PerformanceThresholds;
use crate::error::{Error, Result};
use crate::job::{JobAnalytics, JobMemory, PatternMatch, TimeRange};
use crate::job_store::JobMemoryStore;

/// Analytics over the job memory corpus. Reads exclusively from the store.
pub struct AnalyticsEngine {
    store: Arc<JobMemoryStore>,
    thresholds: PerformanceThresholds,
}

impl AnalyticsEngine {
    /// Create an engine over the given store.
    #[must_use]
    pub fn new(store: Arc<JobMemoryStore>, thresholds: PerformanceThresholds) -> Self {
        Self { store, thresholds }
    }

    /// Prepare the analytics cache directory. Idempotent.
    pub async fn initialize(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.store.layout().analytics_dir()).await?;
        Ok(())
    }

    /// Full analytics block for one job: efficiency metrics, scores, and
    /// matches against the mined corpus patterns.
    pub async fn calculate_job_analytics(&self, job_id: &str) -> Result<JobAnalytics> {
        let started = Instant::now();
        let memory = self.load_job(job_id).await?;
        let corpus = self.load_corpus().await?;

        let mut corpus_patterns = patterns::identify_success_patterns(&corpus);
        corpus_patterns.extend(patterns::identify_failure_patterns(&corpus));

        let analytics = JobAnalytics {
            pattern_matches: patterns::pattern_matches_for(&memory, &corpus_patterns),
            efficiency_metrics: scores::efficiency_metrics(&memory),
            learning_score: scores::learning_score(&memory),
            reuse_score: scores::reuse_score(&memory),
            innovation_score: scores::innovation_score(&memory),
        };

        self.warn_if_slow("calculate_job_analytics", job_id, started);
        Ok(analytics)
    }

    /// Composite efficiency for one job, in [0,1].
    pub async fn calculate_job_efficiency(&self, job_id: &str) -> Result<f32> {
        let started = Instant::now();
        let memory = self.load_job(job_id).await?;
        let score = scores::job_efficiency(&memory);
        self.warn_if_slow("calculate_job_efficiency", job_id, started);
        Ok(score)
    }

    /// Learning score for one job, in [0,1].
    pub async fn calculate_learning_score(&self, job_id: &str) -> Result<f32> {
        let memory = self.load_job(job_id).await?;
        Ok(scores::learning_score(&memory))
    }

    /// Reuse score for one job, in [0,1].
    pub async fn calculate_reuse_score(&self, job_id: &str) -> Result<f32> {
        let memory = self.load_job(job_id).await?;
        Ok(scores::reuse_score(&memory))
    }

    /// Mine success patterns from the given jobs (minimum support 3).
    #[must_use]
    pub fn identify_success_patterns(&self, jobs: &[JobMemory]) -> Vec<JobPattern> {
        patterns::identify_success_patterns(jobs)
    }

    /// Mine failure patterns from the given jobs (minimum support 3).
    #[must_use]
    pub fn identify_failure_patterns(&self, jobs: &[JobMemory]) -> Vec<JobPattern> {
        patterns::identify_failure_patterns(jobs)
    }

    /// Jobs whose feature sets reach the similarity threshold against the
    /// given job, sorted descending.
    pub async fn find_similar_jobs(&self, job_id: &str) -> Result<Vec<SimilarJob>> {
        let memory = self.load_job(job_id).await?;
        let corpus = self.load_corpus().await?;
        let features = similarity::feature_set(&memory);

        let mut similar: Vec<SimilarJob> = corpus
            .iter()
            .filter(|j| j.job_id != memory.job_id)
            .map(|j| SimilarJob {
                job_id: j.job_id.clone(),
                issue_id: j.issue_id.clone(),
                similarity: similarity::jaccard(&features, &similarity::feature_set(j)),
            })
            .filter(|s| s.similarity >= SIMILARITY_THRESHOLD)
            .collect();
        similar.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        Ok(similar)
    }

    /// Search the mined corpus patterns. Returns an empty list, never an
    /// error, when nothing matches.
    pub async fn search_similar_patterns(&self, query: &PatternQuery) -> Result<Vec<PatternMatch>> {
        let corpus = self.load_corpus().await?;
        let mut corpus_patterns = patterns::identify_success_patterns(&corpus);
        corpus_patterns.extend(patterns::identify_failure_patterns(&corpus));
        Ok(patterns::search_patterns(&corpus_patterns, query))
    }

    /// Insight bundle for one job.
    pub async fn get_memory_insights(&self, job_id: &str) -> Result<MemoryInsights> {
        let started = Instant::now();
        let memory = self.load_job(job_id).await?;
        let corpus = self.load_corpus().await?;

        let mut corpus_patterns = patterns::identify_success_patterns(&corpus);
        corpus_patterns.extend(patterns::identify_failure_patterns(&corpus));

        let insights = insights::build(&memory, &corpus_patterns);
        self.warn_if_slow("get_memory_insights", job_id, started);
        Ok(insights)
    }

    /// Aggregate trends over finished jobs in the range. Fails `NotFound`
    /// when no finished job falls inside it.
    pub async fn analyze_trends(&self, range: TimeRange) -> Result<TrendReport> {
        let corpus = self.load_corpus().await?;
        trends::analyze(&corpus, range).ok_or_else(|| {
            Error::NotFound(format!(
                "no completed jobs between {} and {}",
                range.start, range.end
            ))
        })
    }

    /// Predict the outcome of an in-flight job from its partial record.
    pub async fn predict_job_outcome(&self, partial: &JobMemory) -> Result<OutcomePrediction> {
        let corpus = self.load_corpus().await?;
        Ok(prediction::predict(partial, &corpus))
    }

    /// Performance profile for one agent type. `success_rate` is `NaN`
    /// when the agent has no finished jobs.
    pub async fn analyze_agent_performance(&self, agent_type: &str) -> Result<AgentPerformance> {
        let corpus = self.load_corpus().await?;
        Ok(agents::analyze_agent(agent_type, &corpus))
    }

    /// Profiles for every agent in the corpus, ranked by success rate.
    pub async fn compare_agent_effectiveness(&self) -> Result<Vec<AgentPerformance>> {
        let corpus = self.load_corpus().await?;
        Ok(agents::compare_agents(&corpus))
    }

    /// Load one job, falling back to its archived copy.
    async fn load_job(&self, job_id: &str) -> Result<JobMemory> {
        if let Some(memory) = self.store.get_job_memory(job_id).await? {
            return Ok(memory);
        }
        self.store
            .get_archived_memory(job_id)
            .await?
            .ok_or_else(|| Error::job_not_found(job_id))
    }

    /// Load every live record reachable from the global index. Jobs whose
    /// live file is gone (archived) are skipped.
    async fn load_corpus(&self) -> Result<Vec<JobMemory>> {
        let entries = self.store.get_global_job_log().await?;
        let mut corpus = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(memory) = self.store.get_job_memory(&entry.job_id).await? {
                corpus.push(memory);
            }
        }
        Ok(corpus)
    }

    fn warn_if_slow(&self, operation: &str, job_id: &str, started: Instant) {
        let elapsed = started.elapsed().as_millis() as u64;
        if elapsed > self.thresholds.analytics_calculation_time_ms {
            warn!(
                operation,
                job_id,
                elapsed_ms = elapsed,
                threshold_ms = self.thresholds.analytics_calculation_time_ms,
                "analytics calculation exceeded its time threshold"
            );
        }
    }
}
