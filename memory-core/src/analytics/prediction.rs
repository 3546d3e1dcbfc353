//! Outcome prediction for an in-flight job from its partial record.

use serde::{Deserialize, Serialize};

use crate::job::{GotchaSeverity, JobMemory, JobStatus, OutcomeType, KNOWLEDGE_RETRIEVAL};

use super::similarity::{feature_set, jaccard};

/// Similarity floor for a finished job to count as prediction evidence.
const EVIDENCE_SIMILARITY: f32 = 0.3;

/// Evidence cap; more similar jobs than this do not raise confidence.
const MAX_EVIDENCE: usize = 10;

/// Fallback duration estimate when no evidence exists (minutes).
const DEFAULT_DURATION_MINUTES: u64 = 60;

/// Prediction for an in-flight job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomePrediction {
    /// Whether the job is expected to complete successfully
    pub predicted_success: bool,
    /// Confidence in the prediction, in [0,1]
    pub confidence: f32,
    /// Expected total duration in minutes, always >= 1
    pub estimated_duration_minutes: u64,
    /// Concrete conditions lowering the success estimate
    pub risk_factors: Vec<String>,
    /// Concrete conditions raising the success estimate
    pub success_factors: Vec<String>,
    /// Suggested next actions
    pub recommendations: Vec<String>,
}

/// Predict from the partial record and the finished-job corpus. An empty
/// corpus and an empty record yield a neutral prediction with a non-zero
/// duration estimate.
#[must_use]
pub(crate) fn predict(partial: &JobMemory, corpus: &[JobMemory]) -> OutcomePrediction {
    let features = feature_set(partial);

    let mut evidence: Vec<(&JobMemory, f32)> = corpus
        .iter()
        .filter(|j| j.status != JobStatus::Running && j.job_id != partial.job_id)
        .map(|j| (j, jaccard(&features, &feature_set(j))))
        .filter(|(_, sim)| *sim >= EVIDENCE_SIMILARITY)
        .collect();
    evidence.sort_by(|a, b| b.1.total_cmp(&a.1));
    evidence.truncate(MAX_EVIDENCE);

    let (mut probability, confidence) = if evidence.is_empty() {
        let finished: Vec<&JobMemory> = corpus
            .iter()
            .filter(|j| j.status != JobStatus::Running)
            .collect();
        if finished.is_empty() {
            (0.5, 0.1)
        } else {
            let rate = finished
                .iter()
                .filter(|j| j.status == JobStatus::Completed)
                .count() as f32
                / finished.len() as f32;
            (rate, 0.2)
        }
    } else {
        let rate = evidence
            .iter()
            .filter(|(j, _)| j.status == JobStatus::Completed)
            .count() as f32
            / evidence.len() as f32;
        (rate, (0.3 + 0.15 * evidence.len() as f32).min(0.9))
    };

    let mut risk_factors = Vec::new();
    let mut success_factors = Vec::new();
    let mut recommendations = Vec::new();

    let unresolved_severe = partial
        .gotchas
        .iter()
        .filter(|g| !g.is_resolved() && g.severity >= GotchaSeverity::High)
        .count();
    if unresolved_severe > 0 {
        probability -= 0.1 * unresolved_severe as f32;
        risk_factors.push(format!(
            "{unresolved_severe} unresolved high/critical gotchas"
        ));
        recommendations
            .push("Resolve outstanding severe gotchas before recording more work.".to_string());
    }

    let failures_so_far = partial
        .outcomes
        .iter()
        .filter(|o| o.outcome_type == OutcomeType::Failure)
        .count();
    if failures_so_far > partial.successful_outcome_count() {
        probability -= 0.1;
        risk_factors.push(format!("{failures_so_far} failure outcomes already recorded"));
    }

    if partial
        .gotchas
        .iter()
        .filter(|g| g.is_resolved())
        .count()
        > 0
    {
        probability += 0.05;
        success_factors.push("previous gotchas were resolved".to_string());
    }

    if partial
        .context
        .iter()
        .any(|c| c.entry_type == KNOWLEDGE_RETRIEVAL)
    {
        probability += 0.05;
        success_factors.push("knowledge from prior jobs is being reused".to_string());
    } else if !evidence.is_empty() {
        recommendations.push(
            "Similar jobs exist; retrieve their learnings before deciding further.".to_string(),
        );
    }

    if recommendations.is_empty() {
        recommendations.push("Keep recording decisions and outcomes as work proceeds.".to_string());
    }

    let durations: Vec<u64> = evidence
        .iter()
        .filter_map(|(j, _)| j.metadata.total_duration)
        .collect();
    let estimated_duration_minutes = if durations.is_empty() {
        DEFAULT_DURATION_MINUTES
    } else {
        (durations.iter().sum::<u64>() / durations.len() as u64).max(1)
    };

    let probability = probability.clamp(0.0, 1.0);
    OutcomePrediction {
        predicted_success: probability >= 0.5,
        confidence: confidence.clamp(0.0, 1.0),
        estimated_duration_minutes,
        risk_factors,
        success_factors,
        recommendations,
    }
}
