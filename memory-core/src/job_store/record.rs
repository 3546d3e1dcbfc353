//! Entry-recording operations: decisions, gotchas, context, outcomes.
//!
//! Each operation runs under the per-job lock: assign a fresh entry id and
//! authoritative timestamp, track the entry's agent in
//! `metadata.agent_types`, append to the right collection, atomically
//! rewrite the live record.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::job::{
    ContextEntry, ContextUsage, Decision, DecisionOption, DecisionOutcome, Gotcha,
    GotchaResolution, GotchaSeverity, JobMemory, Outcome, OutcomeMetrics, OutcomeType,
};

use super::ids::generate_entry_id;
use super::JobMemoryStore;

/// Input for [`JobMemoryStore::record_decision`].
#[derive(Debug, Clone)]
pub struct NewDecision {
    /// Agent making the decision
    pub agent_type: String,
    /// Decision category
    pub category: String,
    /// What was decided
    pub description: String,
    /// Why it was decided
    pub reasoning: String,
    /// Options considered; exactly one should carry `selected = true`
    pub options: Vec<DecisionOption>,
}

/// Input for [`JobMemoryStore::record_gotcha`].
#[derive(Debug, Clone)]
pub struct NewGotcha {
    /// Agent that hit the pitfall
    pub agent_type: String,
    /// Severity classification
    pub severity: GotchaSeverity,
    /// Gotcha category
    pub category: String,
    /// What happened
    pub description: String,
    /// Normalized error signature
    pub error_pattern: String,
    /// Situation in which it occurred
    pub context: String,
    /// Notes on avoiding it
    pub prevention_notes: Vec<String>,
}

/// Input for [`JobMemoryStore::record_context`].
#[derive(Debug, Clone)]
pub struct NewContext {
    /// Agent that consulted the artifact
    pub agent_type: String,
    /// Artifact kind; `"knowledge-retrieval"` marks reused knowledge
    pub entry_type: String,
    /// Opaque source identifier
    pub source: String,
    /// Consumed content
    pub content: String,
    /// Relevance in [0,1]
    pub relevance_score: f32,
}

/// Input for [`JobMemoryStore::record_outcome`] and
/// [`JobMemoryStore::complete_job_memory`].
#[derive(Debug, Clone)]
pub struct NewOutcome {
    /// Agent that produced the result
    pub agent_type: String,
    /// Result classification
    pub outcome_type: OutcomeType,
    /// Outcome category
    pub category: String,
    /// What happened
    pub description: String,
    /// Measurements
    pub metrics: OutcomeMetrics,
    /// Decisions that led here
    pub related_decisions: Vec<String>,
    /// Gotchas involved
    pub related_gotchas: Vec<String>,
    /// Lessons captured
    pub lessons: Vec<String>,
}

/// Input for [`JobMemoryStore::track_context_usage`].
#[derive(Debug, Clone, Default)]
pub struct NewContextUsage {
    /// Decision the artifact fed into, if any
    pub decision_id: Option<String>,
    /// Gotcha the artifact helped with, if any
    pub gotcha_id: Option<String>,
    /// Free-form impact description
    pub impact: String,
}

/// Materialize an outcome draft with a fresh id and timestamp.
pub(super) fn build_outcome(draft: NewOutcome) -> Outcome {
    Outcome {
        id: generate_entry_id("outcome"),
        timestamp: Utc::now(),
        agent_type: draft.agent_type,
        outcome_type: draft.outcome_type,
        category: draft.category,
        description: draft.description,
        metrics: draft.metrics,
        related_decisions: draft.related_decisions,
        related_gotchas: draft.related_gotchas,
        lessons: draft.lessons,
    }
}

impl JobMemoryStore {
    /// Record a decision. Returns the updated record.
    pub async fn record_decision(&self, job_id: &str, draft: NewDecision) -> Result<JobMemory> {
        self.mutate(job_id, |memory| {
            memory.metadata.track_agent(&draft.agent_type);
            memory.decisions.push(Decision {
                id: generate_entry_id("decision"),
                timestamp: Utc::now(),
                agent_type: draft.agent_type,
                category: draft.category,
                description: draft.description,
                reasoning: draft.reasoning,
                options: draft.options,
                outcome: None,
            });
            Ok(())
        })
        .await
    }

    /// Record a gotcha. Returns the updated record.
    pub async fn record_gotcha(&self, job_id: &str, draft: NewGotcha) -> Result<JobMemory> {
        self.mutate(job_id, |memory| {
            memory.metadata.track_agent(&draft.agent_type);
            memory.gotchas.push(Gotcha {
                id: generate_entry_id("gotcha"),
                timestamp: Utc::now(),
                agent_type: draft.agent_type,
                severity: draft.severity,
                category: draft.category,
                description: draft.description,
                error_pattern: draft.error_pattern,
                context: draft.context,
                prevention_notes: draft.prevention_notes,
                resolution: None,
            });
            Ok(())
        })
        .await
    }

    /// Record a consulted artifact with an empty usage list. Returns the
    /// updated record.
    pub async fn record_context(&self, job_id: &str, draft: NewContext) -> Result<JobMemory> {
        self.mutate(job_id, |memory| {
            memory.metadata.track_agent(&draft.agent_type);
            memory.context.push(ContextEntry {
                id: generate_entry_id("context"),
                timestamp: Utc::now(),
                agent_type: draft.agent_type,
                entry_type: draft.entry_type,
                source: draft.source,
                content: draft.content,
                relevance_score: draft.relevance_score.clamp(0.0, 1.0),
                usage: Vec::new(),
            });
            Ok(())
        })
        .await
    }

    /// Record an intermediate outcome. Returns the updated record.
    pub async fn record_outcome(&self, job_id: &str, draft: NewOutcome) -> Result<JobMemory> {
        self.mutate(job_id, |memory| {
            memory.metadata.track_agent(&draft.agent_type);
            let outcome = build_outcome(draft);
            memory.outcomes.push(outcome);
            Ok(())
        })
        .await
    }

    /// Attach a resolution to a gotcha. The resolution timestamp is set by
    /// the store. Fails `NotFound` when the gotcha is absent.
    pub async fn resolve_gotcha(
        &self,
        job_id: &str,
        gotcha_id: &str,
        mut resolution: GotchaResolution,
    ) -> Result<JobMemory> {
        resolution.timestamp = Utc::now();
        resolution.confidence = resolution.confidence.clamp(0.0, 1.0);
        self.mutate(job_id, |memory| {
            let gotcha = memory
                .gotchas
                .iter_mut()
                .find(|g| g.id == gotcha_id)
                .ok_or_else(|| Error::entry_not_found("gotcha", gotcha_id, job_id))?;
            gotcha.resolution = Some(resolution);
            Ok(())
        })
        .await
    }

    /// Attach a retrospective outcome to a decision. Symmetric to
    /// [`resolve_gotcha`](JobMemoryStore::resolve_gotcha).
    pub async fn update_decision_outcome(
        &self,
        job_id: &str,
        decision_id: &str,
        mut outcome: DecisionOutcome,
    ) -> Result<JobMemory> {
        outcome.timestamp = Utc::now();
        self.mutate(job_id, |memory| {
            let decision = memory
                .decisions
                .iter_mut()
                .find(|d| d.id == decision_id)
                .ok_or_else(|| Error::entry_not_found("decision", decision_id, job_id))?;
            decision.outcome = Some(outcome);
            Ok(())
        })
        .await
    }

    /// Append a usage record to a context entry with an authoritative
    /// timestamp. Fails `NotFound` when the entry is absent.
    pub async fn track_context_usage(
        &self,
        job_id: &str,
        context_id: &str,
        usage: NewContextUsage,
    ) -> Result<JobMemory> {
        self.mutate(job_id, |memory| {
            let entry = memory
                .context
                .iter_mut()
                .find(|c| c.id == context_id)
                .ok_or_else(|| Error::entry_not_found("context entry", context_id, job_id))?;
            entry.usage.push(ContextUsage {
                decision_id: usage.decision_id,
                gotcha_id: usage.gotcha_id,
                impact: usage.impact,
                timestamp: Utc::now(),
            });
            Ok(())
        })
        .await
    }

    /// Load-mutate-persist under the per-job lock, refreshing the global
    /// index entry afterwards.
    async fn mutate<F>(&self, job_id: &str, apply: F) -> Result<JobMemory>
    where
        F: FnOnce(&mut JobMemory) -> Result<()>,
    {
        let lock = self.lock_for(job_id).await;
        let _guard = lock.lock().await;

        let mut memory = self.load_required(job_id).await?;
        if memory.is_complete() {
            return Err(Error::Conflict(format!(
                "job {job_id} is complete; entries can no longer be recorded"
            )));
        }
        apply(&mut memory)?;
        self.warn_if_oversized(&memory);
        self.persist(&memory).await?;
        self.update_index_entry(&memory).await?;
        Ok(memory)
    }
}
