//! Job feature extraction and Jaccard similarity.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::job::JobMemory;

/// Jobs at or above this similarity count as similar.
pub const SIMILARITY_THRESHOLD: f32 = 0.6;

/// A job similar to the queried one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarJob {
    /// The similar job's id
    pub job_id: String,
    /// Its issue id
    pub issue_id: String,
    /// Jaccard similarity of the feature sets, in [0,1]
    pub similarity: f32,
}

/// Feature set of a job: agent types, decision/gotcha/outcome categories,
/// and decision-description tokens, each namespaced to avoid collisions
/// between dimensions.
#[must_use]
pub(crate) fn feature_set(memory: &JobMemory) -> HashSet<String> {
    let mut features = HashSet::new();

    for agent in &memory.metadata.agent_types {
        features.insert(format!("agent:{}", agent.to_lowercase()));
    }
    for decision in &memory.decisions {
        features.insert(format!("category:{}", decision.category.to_lowercase()));
        for token in tokens(&decision.description) {
            features.insert(format!("token:{token}"));
        }
    }
    for gotcha in &memory.gotchas {
        features.insert(format!("category:{}", gotcha.category.to_lowercase()));
    }
    for outcome in &memory.outcomes {
        features.insert(format!("category:{}", outcome.category.to_lowercase()));
    }

    features
}

/// Jaccard index of two feature sets; 0.0 when both are empty.
#[must_use]
pub(crate) fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f32 / union as f32
}

fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_string)
        .collect()
}
