//! Shared fixtures for job-memory integration tests.
//!
//! Draft factories for store inputs, an in-memory builder for analytics
//! fixtures, and a recording knowledge-store double for promotion tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use job_memory_core::config::MemoryConfig;
use job_memory_core::job::{
    ComplexityLevel, Decision, DecisionOption, Gotcha, GotchaResolution, GotchaSeverity,
    JobMemory, JobStatus, Outcome, OutcomeMetrics, OutcomeType,
};
use job_memory_core::job_store::{NewContext, NewDecision, NewGotcha, NewOutcome};
use job_memory_core::manager::MemoryManager;
use job_memory_core::promotion::{GotchaPattern, KnowledgeStore};

/// A manager over a temp directory, with the background log flush disabled
/// so tests control durability points, already initialized.
pub async fn test_manager(dir: &std::path::Path) -> MemoryManager {
    let mut config = MemoryConfig::with_base_path(dir);
    config.log.flush_interval_ms = 0;
    let manager = MemoryManager::new(config);
    manager.initialize().await.expect("manager initializes");
    manager
}

/// Decision draft with one selected option.
#[must_use]
pub fn decision_draft(agent: &str, category: &str, description: &str) -> NewDecision {
    NewDecision {
        agent_type: agent.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        reasoning: "picked for the test scenario".to_string(),
        options: vec![
            DecisionOption {
                name: "chosen".to_string(),
                pros: vec!["fits".to_string()],
                cons: vec![],
                selected: true,
            },
            DecisionOption {
                name: "rejected".to_string(),
                pros: vec![],
                cons: vec!["does not fit".to_string()],
                selected: false,
            },
        ],
    }
}

/// Gotcha draft at the given severity.
#[must_use]
pub fn gotcha_draft(agent: &str, severity: GotchaSeverity, error_pattern: &str) -> NewGotcha {
    NewGotcha {
        agent_type: agent.to_string(),
        severity,
        category: "integration".to_string(),
        description: format!("hit: {error_pattern}"),
        error_pattern: error_pattern.to_string(),
        context: "test scenario".to_string(),
        prevention_notes: vec![],
    }
}

/// Resolution marked resolved at the given confidence.
#[must_use]
pub fn resolution(confidence: f32, solution: &str) -> GotchaResolution {
    GotchaResolution {
        resolved: true,
        resolution_time: 8.0,
        solution: solution.to_string(),
        prevention_steps: vec!["prevent it next time".to_string()],
        confidence,
        timestamp: Utc::now(),
    }
}

/// Context draft of the given entry type.
#[must_use]
pub fn context_draft(agent: &str, entry_type: &str, content: &str) -> NewContext {
    NewContext {
        agent_type: agent.to_string(),
        entry_type: entry_type.to_string(),
        source: "card-test".to_string(),
        content: content.to_string(),
        relevance_score: 0.8,
    }
}

/// Outcome draft of the given type.
#[must_use]
pub fn outcome_draft(agent: &str, outcome_type: OutcomeType) -> NewOutcome {
    NewOutcome {
        agent_type: agent.to_string(),
        outcome_type,
        category: "delivery".to_string(),
        description: format!("{outcome_type} outcome"),
        metrics: OutcomeMetrics::default(),
        related_decisions: vec![],
        related_gotchas: vec![],
        lessons: vec!["a lesson".to_string()],
    }
}

/// In-memory builder for `JobMemory` values used by analytics fixtures that
/// bypass the store.
pub struct JobMemoryBuilder {
    memory: JobMemory,
    counter: usize,
}

impl JobMemoryBuilder {
    /// Start a builder for the given issue.
    #[must_use]
    pub fn new(issue_id: &str) -> Self {
        Self {
            memory: JobMemory::new(
                format!("job-{issue_id}-{}-fixtur", Utc::now().timestamp_millis()),
                issue_id.to_string(),
                "fixture_session".to_string(),
            ),
            counter: 0,
        }
    }

    /// Set the lifecycle status; finished statuses also set an end time
    /// and duration.
    #[must_use]
    pub fn status(mut self, status: JobStatus) -> Self {
        self.memory.status = status;
        if status != JobStatus::Running {
            self.memory.end_time = Some(Utc::now());
            self.memory.metadata.total_duration = Some(30);
        }
        self
    }

    /// Set the complexity classification.
    #[must_use]
    pub fn complexity(mut self, complexity: ComplexityLevel) -> Self {
        self.memory.metadata.complexity = complexity;
        self
    }

    /// Append a decision in the given category.
    #[must_use]
    pub fn decision(mut self, agent: &str, category: &str, description: &str) -> Self {
        self.counter += 1;
        self.memory.metadata.track_agent(agent);
        self.memory.decisions.push(Decision {
            id: format!("decision-{}-fixture{:03}", self.counter, self.counter),
            timestamp: Utc::now(),
            agent_type: agent.to_string(),
            category: category.to_string(),
            description: description.to_string(),
            reasoning: String::new(),
            options: vec![],
            outcome: None,
        });
        self
    }

    /// Append a gotcha, optionally resolved.
    #[must_use]
    pub fn gotcha(
        mut self,
        agent: &str,
        severity: GotchaSeverity,
        error_pattern: &str,
        resolution: Option<GotchaResolution>,
    ) -> Self {
        self.counter += 1;
        self.memory.metadata.track_agent(agent);
        self.memory.gotchas.push(Gotcha {
            id: format!("gotcha-{}-fixture{:03}", self.counter, self.counter),
            timestamp: Utc::now(),
            agent_type: agent.to_string(),
            severity,
            category: "integration".to_string(),
            description: format!("hit: {error_pattern}"),
            error_pattern: error_pattern.to_string(),
            context: String::new(),
            prevention_notes: vec![],
            resolution,
        });
        self
    }

    /// Append an outcome of the given type.
    #[must_use]
    pub fn outcome(mut self, agent: &str, outcome_type: OutcomeType) -> Self {
        self.counter += 1;
        self.memory.metadata.track_agent(agent);
        self.memory.outcomes.push(Outcome {
            id: format!("outcome-{}-fixture{:03}", self.counter, self.counter),
            timestamp: Utc::now(),
            agent_type: agent.to_string(),
            outcome_type,
            category: "delivery".to_string(),
            description: String::new(),
            metrics: OutcomeMetrics::default(),
            related_decisions: vec![],
            related_gotchas: vec![],
            lessons: vec![],
        });
        self
    }

    /// Finish the build.
    #[must_use]
    pub fn build(self) -> JobMemory {
        self.memory
    }
}

/// Knowledge-store double that records every promoted pattern; can be told
/// to reject patterns whose signature matches a string.
pub struct RecordingKnowledgeStore {
    received: Mutex<Vec<GotchaPattern>>,
    reject_pattern: Option<String>,
}

impl RecordingKnowledgeStore {
    /// A store that accepts everything.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            received: Mutex::new(Vec::new()),
            reject_pattern: None,
        })
    }

    /// A store that rejects patterns with the given error signature.
    #[must_use]
    pub fn rejecting(pattern: &str) -> Arc<Self> {
        Arc::new(Self {
            received: Mutex::new(Vec::new()),
            reject_pattern: Some(pattern.to_string()),
        })
    }

    /// Patterns received so far.
    pub async fn received(&self) -> Vec<GotchaPattern> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl KnowledgeStore for RecordingKnowledgeStore {
    async fn record_gotcha(&self, pattern: GotchaPattern) -> anyhow::Result<()> {
        if self.reject_pattern.as_deref() == Some(pattern.pattern.as_str()) {
            anyhow::bail!("rejected pattern {}", pattern.pattern);
        }
        self.received.lock().await.push(pattern);
        Ok(())
    }
}
