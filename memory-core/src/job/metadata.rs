//! Job-level metadata and persisted analytics.

use serde::{Deserialize, Serialize};

/// Job complexity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    /// Single-agent, short-lived work
    Low,
    /// Multi-step work with a handful of agents
    #[default]
    Medium,
    /// Long-running work with many agents and dependencies
    High,
}

impl std::fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplexityLevel::Low => write!(f, "low"),
            ComplexityLevel::Medium => write!(f, "medium"),
            ComplexityLevel::High => write!(f, "high"),
        }
    }
}

/// Metadata block of a job memory.
///
/// `agent_types` is maintained by the store as an order-preserving set: every
/// distinct agent referenced by any recorded entry appears exactly once, in
/// first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JobMetadata {
    /// Distinct agents that contributed to the job, first-seen order
    pub agent_types: Vec<String>,
    /// Complexity classification
    pub complexity: ComplexityLevel,
    /// Free-form priority label
    pub priority: String,
    /// Free-form tags
    pub tags: Vec<String>,
    /// External issues related to this one
    pub related_issues: Vec<String>,
    /// Jobs spawned by this job
    pub child_jobs: Vec<String>,
    /// Total duration in minutes, set on completion (always >= 1)
    #[serde(default)]
    pub total_duration: Option<u64>,
}

impl JobMetadata {
    /// Insert an agent type if not already present, preserving order.
    pub fn track_agent(&mut self, agent_type: &str) {
        if !self.agent_types.iter().any(|a| a == agent_type) {
            self.agent_types.push(agent_type.to_string());
        }
    }
}

/// Efficiency metrics derived from a job's recorded entries.
///
/// Times are in minutes; rates are fractions in [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct EfficiencyMetrics {
    /// Mean minutes from job start to each decision
    pub decision_time: f32,
    /// Mean resolution time over resolved gotchas
    pub gotcha_resolution_time: f32,
    /// Mean minutes from job start to each context entry
    pub context_retrieval_time: f32,
    /// Fraction of context entries that are knowledge retrievals
    pub knowledge_reuse_rate: f32,
    /// Unresolved gotchas over total gotchas
    pub error_rate: f32,
}

/// Kind discriminator for cross-job patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Structure repeatedly associated with successful jobs
    Success,
    /// Structure repeatedly associated with failed jobs
    Failure,
    /// Recurring decision structure
    Decision,
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternKind::Success => write!(f, "success"),
            PatternKind::Failure => write!(f, "failure"),
            PatternKind::Decision => write!(f, "decision"),
        }
    }
}

/// A match between a job and a mined cross-job pattern. Persisted inside
/// [`JobAnalytics`] and returned by pattern search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    /// Id of the matched pattern
    pub pattern_id: String,
    /// Pattern kind
    pub pattern_type: PatternKind,
    /// Human-readable description of the pattern
    pub description: String,
    /// Match confidence in [0,1]
    pub confidence: f32,
    /// Jobs that contributed to the pattern
    #[serde(default)]
    pub source_jobs: Vec<String>,
}

/// Analytics block persisted on a job memory after completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JobAnalytics {
    /// Cross-job patterns this job matched
    pub pattern_matches: Vec<PatternMatch>,
    /// Derived efficiency metrics
    pub efficiency_metrics: EfficiencyMetrics,
    /// Rewards resolved gotchas and captured lessons, in [0,1]
    pub learning_score: f32,
    /// Rewards knowledge retrieval and impactful usage, in [0,1]
    pub reuse_score: f32,
    /// Rewards option exploration and novel categories, in [0,1]
    pub innovation_score: f32,
}
