//! Per-job insight bundles: summary, patterns, recommendations, metrics.

use serde::{Deserialize, Serialize};

use crate::job::{JobMemory, JobStatus};

use super::patterns::JobPattern;
use super::scores;

/// High-level summary of a job's outcome quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSummary {
    /// Whether the job completed successfully
    pub overall_success: bool,
    /// Composite efficiency in [0,1]
    pub efficiency: f32,
    /// Learning score in [0,1]
    pub learning_value: f32,
    /// Knowledge reuse rate in [0,1]
    pub reuse_rate: f32,
}

/// Patterns relevant to the job, split by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InsightPatterns {
    /// Success patterns the job matches
    pub success: Vec<JobPattern>,
    /// Failure patterns the job matches
    pub failure: Vec<JobPattern>,
    /// Decision categories the job recorded
    pub decision_categories: Vec<String>,
}

/// Recommendations grouped by audience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InsightRecommendations {
    /// Advice for future jobs on similar issues
    pub future_jobs: Vec<String>,
    /// Candidates for the knowledge base
    pub knowledge_base: Vec<String>,
    /// Process-level observations
    pub process: Vec<String>,
}

/// Totals and averages over the job's entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InsightMetrics {
    /// Recorded decisions
    pub total_decisions: usize,
    /// Recorded gotchas
    pub total_gotchas: usize,
    /// Resolved gotchas
    pub resolved_gotchas: usize,
    /// Recorded context entries
    pub total_context_entries: usize,
    /// Recorded outcomes
    pub total_outcomes: usize,
    /// Mean context relevance, 0 with no entries
    pub average_relevance: f32,
    /// Lessons captured anywhere on the job
    pub lessons_captured: usize,
}

/// Full insight bundle for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryInsights {
    /// The analyzed job
    pub job_id: String,
    /// Outcome quality summary
    pub summary: InsightSummary,
    /// Relevant patterns
    pub patterns: InsightPatterns,
    /// Grouped recommendations
    pub recommendations: InsightRecommendations,
    /// Entry totals and averages
    pub key_metrics: InsightMetrics,
}

/// Assemble the bundle from the record and the mined corpus patterns.
#[must_use]
pub(crate) fn build(memory: &JobMemory, corpus_patterns: &[JobPattern]) -> MemoryInsights {
    let matches = super::patterns::pattern_matches_for(memory, corpus_patterns);
    let matched_ids: Vec<&str> = matches.iter().map(|m| m.pattern_id.as_str()).collect();

    let mut patterns = InsightPatterns::default();
    for pattern in corpus_patterns {
        if !matched_ids.contains(&pattern.id()) {
            continue;
        }
        match pattern {
            JobPattern::Success { .. } => patterns.success.push(pattern.clone()),
            JobPattern::Failure { .. } => patterns.failure.push(pattern.clone()),
        }
    }
    for decision in &memory.decisions {
        let category = decision.category.to_lowercase();
        if !patterns.decision_categories.contains(&category) {
            patterns.decision_categories.push(category);
        }
    }

    let resolved = memory.gotchas.iter().filter(|g| g.is_resolved()).count();
    let average_relevance = if memory.context.is_empty() {
        0.0
    } else {
        memory.context.iter().map(|c| c.relevance_score).sum::<f32>()
            / memory.context.len() as f32
    };

    let summary = InsightSummary {
        overall_success: memory.status == JobStatus::Completed,
        efficiency: scores::job_efficiency(memory),
        learning_value: scores::learning_score(memory),
        reuse_rate: scores::efficiency_metrics(memory).knowledge_reuse_rate,
    };

    let mut recommendations = InsightRecommendations::default();
    if summary.reuse_rate == 0.0 && !memory.decisions.is_empty() {
        recommendations
            .future_jobs
            .push("No prior knowledge was consulted; retrieve similar jobs first.".to_string());
    }
    for pattern in &patterns.failure {
        recommendations.future_jobs.push(format!(
            "Watch for known failure pattern: {}",
            pattern.description()
        ));
    }
    for gotcha in memory.gotchas.iter().filter(|g| g.is_resolved()) {
        if gotcha.severity.is_promotable() {
            recommendations.knowledge_base.push(format!(
                "Resolved {} gotcha '{}' is a promotion candidate",
                gotcha.severity, gotcha.description
            ));
        }
    }
    if resolved < memory.gotchas.len() {
        recommendations.process.push(format!(
            "{} gotchas ended the job unresolved; schedule follow-up",
            memory.gotchas.len() - resolved
        ));
    }
    if memory.outcomes.is_empty() {
        recommendations
            .process
            .push("No outcomes recorded; completion classification has no signal.".to_string());
    }

    MemoryInsights {
        job_id: memory.job_id.clone(),
        summary,
        patterns,
        recommendations,
        key_metrics: InsightMetrics {
            total_decisions: memory.decisions.len(),
            total_gotchas: memory.gotchas.len(),
            resolved_gotchas: resolved,
            total_context_entries: memory.context.len(),
            total_outcomes: memory.outcomes.len(),
            average_relevance,
            lessons_captured: memory.lesson_count(),
        },
    }
}
