//! Per-job score and efficiency-metric calculation.
//!
//! All scores are clamped to [0,1]. Where a job has no input signal for a
//! component (no outcomes, no gotchas) the component contributes the
//! documented sentinel rather than dividing by zero.

use chrono::{DateTime, Utc};

use crate::job::{EfficiencyMetrics, JobMemory, KNOWLEDGE_RETRIEVAL};

/// Duration at or under which the duration factor is 1.0 (minutes).
const FAST_JOB_MINUTES: f32 = 30.0;
/// Duration at or over which the duration factor is 0.0 (minutes).
const SLOW_JOB_MINUTES: f32 = 480.0;

/// Derive the efficiency metrics block from a job's recorded entries.
#[must_use]
pub(crate) fn efficiency_metrics(memory: &JobMemory) -> EfficiencyMetrics {
    let decision_time = mean_minutes_from_start(
        memory.start_time,
        memory.decisions.iter().map(|d| d.timestamp),
    );
    let context_retrieval_time = mean_minutes_from_start(
        memory.start_time,
        memory.context.iter().map(|c| c.timestamp),
    );

    let resolutions: Vec<f32> = memory
        .gotchas
        .iter()
        .filter_map(|g| g.resolution.as_ref())
        .filter(|r| r.resolved)
        .map(|r| r.resolution_time)
        .collect();
    let gotcha_resolution_time = if resolutions.is_empty() {
        0.0
    } else {
        resolutions.iter().sum::<f32>() / resolutions.len() as f32
    };

    let knowledge_reuse_rate = if memory.context.is_empty() {
        0.0
    } else {
        memory
            .context
            .iter()
            .filter(|c| c.entry_type == KNOWLEDGE_RETRIEVAL)
            .count() as f32
            / memory.context.len() as f32
    };

    let error_rate = if memory.gotchas.is_empty() {
        0.0
    } else {
        memory.gotchas.iter().filter(|g| !g.is_resolved()).count() as f32
            / memory.gotchas.len() as f32
    };

    EfficiencyMetrics {
        decision_time,
        gotcha_resolution_time,
        context_retrieval_time,
        knowledge_reuse_rate,
        error_rate,
    }
}

/// Composite efficiency in [0,1]: outcome success ratio, gotcha resolution
/// ratio, and a duration factor decaying linearly from 30 minutes to 8
/// hours.
#[must_use]
pub(crate) fn job_efficiency(memory: &JobMemory) -> f32 {
    let outcome_ratio = if memory.outcomes.is_empty() {
        0.0
    } else {
        memory.successful_outcome_count() as f32 / memory.outcomes.len() as f32
    };

    // A job with no gotchas has nothing unresolved.
    let resolution_ratio = if memory.gotchas.is_empty() {
        1.0
    } else {
        memory.gotchas.iter().filter(|g| g.is_resolved()).count() as f32
            / memory.gotchas.len() as f32
    };

    let minutes = memory
        .metadata
        .total_duration
        .map_or_else(|| elapsed_minutes(memory.start_time), |m| m as f32);
    let duration_factor = if minutes <= FAST_JOB_MINUTES {
        1.0
    } else if minutes >= SLOW_JOB_MINUTES {
        0.0
    } else {
        1.0 - (minutes - FAST_JOB_MINUTES) / (SLOW_JOB_MINUTES - FAST_JOB_MINUTES)
    };

    (0.4 * outcome_ratio + 0.3 * resolution_ratio + 0.3 * duration_factor).clamp(0.0, 1.0)
}

/// Rewards resolved gotchas and captured lessons.
#[must_use]
pub(crate) fn learning_score(memory: &JobMemory) -> f32 {
    let resolved_ratio = if memory.gotchas.is_empty() {
        0.0
    } else {
        memory.gotchas.iter().filter(|g| g.is_resolved()).count() as f32
            / memory.gotchas.len() as f32
    };

    let lesson_density =
        (memory.lesson_count() as f32 / (memory.entry_count() + 1) as f32).clamp(0.0, 1.0);

    (0.5 * resolved_ratio + 0.5 * lesson_density).clamp(0.0, 1.0)
}

/// Rewards knowledge retrieval and context entries that were actually used.
#[must_use]
pub(crate) fn reuse_score(memory: &JobMemory) -> f32 {
    if memory.context.is_empty() {
        return 0.0;
    }

    let retrieval_rate = memory
        .context
        .iter()
        .filter(|c| c.entry_type == KNOWLEDGE_RETRIEVAL)
        .count() as f32
        / memory.context.len() as f32;

    let used_rate = memory.context.iter().filter(|c| !c.usage.is_empty()).count() as f32
        / memory.context.len() as f32;

    (0.6 * retrieval_rate + 0.4 * used_rate).clamp(0.0, 1.0)
}

/// Rewards option exploration and category diversity in decisions.
#[must_use]
pub(crate) fn innovation_score(memory: &JobMemory) -> f32 {
    if memory.decisions.is_empty() {
        return 0.0;
    }

    let multi_option = memory
        .decisions
        .iter()
        .filter(|d| d.options.len() >= 2)
        .count() as f32
        / memory.decisions.len() as f32;

    let mut categories: Vec<&str> = memory.decisions.iter().map(|d| d.category.as_str()).collect();
    categories.sort_unstable();
    categories.dedup();
    let novelty = categories.len() as f32 / memory.decisions.len() as f32;

    (0.5 * multi_option + 0.5 * novelty).clamp(0.0, 1.0)
}

fn mean_minutes_from_start(
    start: DateTime<Utc>,
    timestamps: impl Iterator<Item = DateTime<Utc>>,
) -> f32 {
    let offsets: Vec<f32> = timestamps
        .map(|t| ((t - start).num_seconds().max(0) as f32) / 60.0)
        .collect();
    if offsets.is_empty() {
        0.0
    } else {
        offsets.iter().sum::<f32>() / offsets.len() as f32
    }
}

fn elapsed_minutes(start: DateTime<Utc>) -> f32 {
    ((Utc::now() - start).num_seconds().max(0) as f32) / 60.0
}
