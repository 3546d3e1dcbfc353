//! Entry types recorded into a job memory: decisions, gotchas, context
//! entries, and outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity classification for an encountered pitfall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GotchaSeverity {
    /// Cosmetic or trivially recoverable
    Low,
    /// Slowed the job down but had a known workaround
    Medium,
    /// Blocked progress until resolved
    High,
    /// Threatened the job outcome or corrupted state
    Critical,
}

impl GotchaSeverity {
    /// Whether this severity qualifies for knowledge-store promotion.
    #[must_use]
    pub fn is_promotable(&self) -> bool {
        matches!(self, GotchaSeverity::High | GotchaSeverity::Critical)
    }
}

impl std::fmt::Display for GotchaSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GotchaSeverity::Low => write!(f, "low"),
            GotchaSeverity::Medium => write!(f, "medium"),
            GotchaSeverity::High => write!(f, "high"),
            GotchaSeverity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for GotchaSeverity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(GotchaSeverity::Low),
            "medium" => Ok(GotchaSeverity::Medium),
            "high" => Ok(GotchaSeverity::High),
            "critical" => Ok(GotchaSeverity::Critical),
            _ => Err(format!("Unknown GotchaSeverity: {s}")),
        }
    }
}

/// Graded result classification for an outcome event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeType {
    /// Objective met
    Success,
    /// Objective missed
    Failure,
    /// Some objectives met, some missed
    Partial,
}

impl std::fmt::Display for OutcomeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeType::Success => write!(f, "success"),
            OutcomeType::Failure => write!(f, "failure"),
            OutcomeType::Partial => write!(f, "partial"),
        }
    }
}

/// One option considered at a decision point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOption {
    /// Short name of the option
    pub name: String,
    /// Arguments in favor
    pub pros: Vec<String>,
    /// Arguments against
    pub cons: Vec<String>,
    /// Exactly one option per decision carries `selected = true`
    pub selected: bool,
}

/// Quality metrics attached to a decision outcome once it is known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct DecisionMetrics {
    /// Minutes spent implementing the chosen option
    pub implementation_time: f32,
    /// Subjective code quality score in [0,1]
    pub code_quality: f32,
    /// Subjective maintainability score in [0,1]
    pub maintainability: f32,
    /// Test coverage fraction in [0,1]
    pub test_coverage: f32,
}

/// Retrospective outcome of a decision, filled in after the fact via
/// `update_decision_outcome`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    /// Whether the chosen option worked out
    pub success: bool,
    /// Measured quality of the result
    pub metrics: DecisionMetrics,
    /// Lessons captured while evaluating the decision
    pub lessons: Vec<String>,
    /// When the outcome was recorded (authoritative, set by the store)
    pub timestamp: DateTime<Utc>,
}

/// A choice made by an agent during the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Store-assigned entry id (`decision-<millis>-<rand9>`)
    pub id: String,
    /// When the decision was recorded
    pub timestamp: DateTime<Utc>,
    /// Agent that made the decision
    pub agent_type: String,
    /// Decision category (e.g. "architecture", "tooling")
    pub category: String,
    /// What was decided
    pub description: String,
    /// Why it was decided
    pub reasoning: String,
    /// Options that were considered
    pub options: Vec<DecisionOption>,
    /// Retrospective outcome, if recorded
    #[serde(default)]
    pub outcome: Option<DecisionOutcome>,
}

impl Decision {
    /// The option that was selected, if the decision is well-formed.
    #[must_use]
    pub fn selected_option(&self) -> Option<&DecisionOption> {
        self.options.iter().find(|o| o.selected)
    }
}

/// Resolution record for a gotcha.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GotchaResolution {
    /// Whether the gotcha was actually resolved
    pub resolved: bool,
    /// Minutes spent resolving
    pub resolution_time: f32,
    /// How it was resolved
    pub solution: String,
    /// Steps that would have prevented it
    pub prevention_steps: Vec<String>,
    /// Confidence in the solution, in [0,1]
    pub confidence: f32,
    /// When the resolution was recorded (authoritative, set by the store)
    pub timestamp: DateTime<Utc>,
}

/// An encountered pitfall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gotcha {
    /// Store-assigned entry id (`gotcha-<millis>-<rand9>`)
    pub id: String,
    /// When the gotcha was recorded
    pub timestamp: DateTime<Utc>,
    /// Agent that hit the pitfall
    pub agent_type: String,
    /// Severity classification
    pub severity: GotchaSeverity,
    /// Category (e.g. "build", "integration")
    pub category: String,
    /// What happened
    pub description: String,
    /// Normalized error signature for cross-job matching
    pub error_pattern: String,
    /// Situation in which the gotcha occurred
    pub context: String,
    /// Notes on avoiding the gotcha, captured at record time
    pub prevention_notes: Vec<String>,
    /// Resolution, once known
    #[serde(default)]
    pub resolution: Option<GotchaResolution>,
}

impl Gotcha {
    /// Whether the gotcha has a resolution marked as resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolution.as_ref().is_some_and(|r| r.resolved)
    }
}

/// Link from a context entry to the decision or gotcha it influenced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextUsage {
    /// Decision the artifact fed into, if any
    #[serde(default)]
    pub decision_id: Option<String>,
    /// Gotcha the artifact helped with, if any
    #[serde(default)]
    pub gotcha_id: Option<String>,
    /// Free-form description of the impact
    pub impact: String,
    /// When the usage was recorded (authoritative, set by the store)
    pub timestamp: DateTime<Utc>,
}

/// An artifact consulted during the job (e.g. a knowledge card).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Store-assigned entry id (`context-<millis>-<rand9>`)
    pub id: String,
    /// When the artifact was consulted
    pub timestamp: DateTime<Utc>,
    /// Agent that consulted it
    pub agent_type: String,
    /// Kind of artifact; `"knowledge-retrieval"` marks reused knowledge
    pub entry_type: String,
    /// Opaque source identifier
    pub source: String,
    /// Consumed content (truncated on archival)
    pub content: String,
    /// Relevance to the job, in [0,1]
    pub relevance_score: f32,
    /// Usage records appended via `track_context_usage`
    #[serde(default)]
    pub usage: Vec<ContextUsage>,
}

/// Entry type marker for reused knowledge; feeds the reuse score.
pub const KNOWLEDGE_RETRIEVAL: &str = "knowledge-retrieval";

/// Line-level change counts attached to an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CodeChanges {
    /// Lines added
    pub lines_added: u64,
    /// Lines removed
    pub lines_removed: u64,
    /// Files touched
    pub files_modified: u64,
}

/// Quality measurements attached to an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct QualityMetrics {
    /// Test coverage fraction in [0,1]
    pub test_coverage: f32,
    /// Outstanding lint errors
    pub lint_errors: u64,
    /// Outstanding type errors
    pub type_errors: u64,
    /// Cyclomatic complexity estimate
    pub complexity: f32,
}

/// Measurements attached to an outcome event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OutcomeMetrics {
    /// Minutes from job start to this outcome
    pub duration: f32,
    /// Code change counts
    pub code_changes: CodeChanges,
    /// Quality measurements
    pub quality_metrics: QualityMetrics,
}

/// A graded result event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Store-assigned entry id (`outcome-<millis>-<rand9>`)
    pub id: String,
    /// When the outcome was recorded
    pub timestamp: DateTime<Utc>,
    /// Agent that produced the result
    pub agent_type: String,
    /// Result classification
    #[serde(rename = "type")]
    pub outcome_type: OutcomeType,
    /// Outcome category (e.g. "deployment", "testing")
    pub category: String,
    /// What happened
    pub description: String,
    /// Measurements for this outcome
    pub metrics: OutcomeMetrics,
    /// Decisions that led to this outcome
    #[serde(default)]
    pub related_decisions: Vec<String>,
    /// Gotchas involved in this outcome
    #[serde(default)]
    pub related_gotchas: Vec<String>,
    /// Lessons captured with the result
    #[serde(default)]
    pub lessons: Vec<String>,
}
