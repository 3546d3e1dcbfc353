//! Aggregate trend analysis over finished jobs in a time range.

use serde::{Deserialize, Serialize};

use crate::job::{JobMemory, JobStatus, TimeRange};

/// Count of jobs sharing a decision category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    /// Decision category
    pub category: String,
    /// Jobs in the range that recorded it
    pub jobs: usize,
}

/// Aggregates over every finished job whose `end_time` falls in the range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    /// The analyzed range
    pub range: TimeRange,
    /// Finished jobs in the range
    pub total_jobs: usize,
    /// Completed jobs over finished jobs, in [0,1]
    pub success_rate: f32,
    /// Mean duration in minutes
    pub average_duration_minutes: f32,
    /// Gotchas recorded across the range
    pub total_gotchas: usize,
    /// Resolved gotchas over total, 0 with none
    pub gotcha_resolution_rate: f32,
    /// Mean learning score over the range's jobs
    pub average_learning_score: f32,
    /// Decision categories by number of jobs recording them, descending
    pub top_decision_categories: Vec<CategoryCount>,
}

/// Build the report. Returns `None` when no finished job falls in the
/// range; the engine maps that to `NotFound`.
#[must_use]
pub(crate) fn analyze(jobs: &[JobMemory], range: TimeRange) -> Option<TrendReport> {
    let in_range: Vec<&JobMemory> = jobs
        .iter()
        .filter(|j| j.status != JobStatus::Running)
        .filter(|j| j.end_time.is_some_and(|end| range.contains(end)))
        .collect();

    if in_range.is_empty() {
        return None;
    }

    let completed = in_range
        .iter()
        .filter(|j| j.status == JobStatus::Completed)
        .count();

    let total_minutes: u64 = in_range
        .iter()
        .filter_map(|j| j.metadata.total_duration)
        .sum();

    let total_gotchas: usize = in_range.iter().map(|j| j.gotchas.len()).sum();
    let resolved_gotchas: usize = in_range
        .iter()
        .map(|j| j.gotchas.iter().filter(|g| g.is_resolved()).count())
        .sum();

    let average_learning_score = in_range
        .iter()
        .map(|j| super::scores::learning_score(j))
        .sum::<f32>()
        / in_range.len() as f32;

    let mut categories: std::collections::BTreeMap<String, usize> =
        std::collections::BTreeMap::new();
    for job in &in_range {
        let mut seen: Vec<String> = job
            .decisions
            .iter()
            .map(|d| d.category.to_lowercase())
            .collect();
        seen.sort_unstable();
        seen.dedup();
        for category in seen {
            *categories.entry(category).or_insert(0) += 1;
        }
    }
    let mut top_decision_categories: Vec<CategoryCount> = categories
        .into_iter()
        .map(|(category, jobs)| CategoryCount { category, jobs })
        .collect();
    top_decision_categories.sort_by(|a, b| b.jobs.cmp(&a.jobs));
    top_decision_categories.truncate(5);

    Some(TrendReport {
        range,
        total_jobs: in_range.len(),
        success_rate: completed as f32 / in_range.len() as f32,
        average_duration_minutes: total_minutes as f32 / in_range.len() as f32,
        total_gotchas,
        gotcha_resolution_rate: if total_gotchas == 0 {
            0.0
        } else {
            resolved_gotchas as f32 / total_gotchas as f32
        },
        average_learning_score,
        top_decision_categories,
    })
}
