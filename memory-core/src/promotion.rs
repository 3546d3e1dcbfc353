//! Promotion gateway: forwards resolved, high-confidence gotchas from
//! completed jobs to the external knowledge store.
//!
//! A gotcha qualifies iff its severity is high or critical, its resolution
//! is marked resolved, and the resolution confidence is at least 0.8. The
//! gateway hands the store immutable value copies; failures on individual
//! gotchas are logged and do not halt the remaining promotions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::job::{Gotcha, GotchaSeverity, JobMemory};

/// Minimum resolution confidence for promotion.
pub const PROMOTION_CONFIDENCE: f32 = 0.8;

/// One observed occurrence of a promoted gotcha pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GotchaOccurrence {
    /// Issue the gotcha occurred on
    pub issue_id: String,
    /// Agent that hit it
    pub agent_type: String,
    /// When it was recorded
    pub timestamp: DateTime<Utc>,
    /// Always true for promoted occurrences
    pub resolved: bool,
    /// Minutes spent resolving
    pub resolution_time: f32,
}

/// Value copy of a gotcha handed to the knowledge store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GotchaPattern {
    /// What happened
    pub description: String,
    /// Normalized error signature
    pub pattern: String,
    /// Severity classification
    pub severity: GotchaSeverity,
    /// Gotcha category
    pub category: String,
    /// How it was resolved
    pub solution: String,
    /// Steps that prevent it
    pub prevention_steps: Vec<String>,
    /// Known occurrences
    pub occurrences: Vec<GotchaOccurrence>,
}

/// Outbound contract to the external knowledge store. The store may fail
/// with any error; callers treat failures as non-fatal.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Persist one promoted gotcha pattern.
    async fn record_gotcha(&self, pattern: GotchaPattern) -> anyhow::Result<()>;
}

/// Whether a gotcha meets every promotion criterion.
#[must_use]
pub fn is_promotable(gotcha: &Gotcha) -> bool {
    gotcha.severity.is_promotable()
        && gotcha
            .resolution
            .as_ref()
            .is_some_and(|r| r.resolved && r.confidence >= PROMOTION_CONFIDENCE)
}

/// Build the promoted value for a qualifying gotcha. Returns `None` when
/// the gotcha does not qualify.
#[must_use]
pub fn build_pattern(memory: &JobMemory, gotcha: &Gotcha) -> Option<GotchaPattern> {
    if !is_promotable(gotcha) {
        return None;
    }
    let resolution = gotcha.resolution.as_ref()?;
    Some(GotchaPattern {
        description: gotcha.description.clone(),
        pattern: gotcha.error_pattern.clone(),
        severity: gotcha.severity,
        category: gotcha.category.clone(),
        solution: resolution.solution.clone(),
        prevention_steps: resolution.prevention_steps.clone(),
        occurrences: vec![GotchaOccurrence {
            issue_id: memory.issue_id.clone(),
            agent_type: gotcha.agent_type.clone(),
            timestamp: gotcha.timestamp,
            resolved: true,
            resolution_time: resolution.resolution_time,
        }],
    })
}

/// Forwards qualifying gotchas to an attached knowledge store.
pub struct PromotionGateway {
    knowledge: RwLock<Option<Arc<dyn KnowledgeStore>>>,
}

impl PromotionGateway {
    /// Gateway with no store attached; promotion is a no-op until
    /// [`attach`](PromotionGateway::attach) is called.
    #[must_use]
    pub fn new() -> Self {
        Self {
            knowledge: RwLock::new(None),
        }
    }

    /// Attach (or replace) the knowledge store.
    pub async fn attach(&self, store: Arc<dyn KnowledgeStore>) {
        let mut knowledge = self.knowledge.write().await;
        *knowledge = Some(store);
    }

    /// Whether a knowledge store is attached.
    pub async fn is_attached(&self) -> bool {
        self.knowledge.read().await.is_some()
    }

    /// Promote every qualifying gotcha of a completed job. Returns the
    /// number delivered; per-gotcha failures are logged and skipped.
    pub async fn promote_job_gotchas(&self, memory: &JobMemory) -> usize {
        let store = {
            let knowledge = self.knowledge.read().await;
            match knowledge.as_ref() {
                Some(store) => Arc::clone(store),
                None => return 0,
            }
        };

        let mut promoted = 0;
        for gotcha in &memory.gotchas {
            let Some(pattern) = build_pattern(memory, gotcha) else {
                continue;
            };
            match store.record_gotcha(pattern).await {
                Ok(()) => promoted += 1,
                Err(e) => {
                    warn!(
                        job_id = %memory.job_id,
                        gotcha_id = %gotcha.id,
                        error = %e,
                        "knowledge store rejected gotcha promotion; continuing"
                    );
                }
            }
        }

        debug!(job_id = %memory.job_id, promoted, "gotcha promotion pass finished");
        promoted
    }
}

impl Default for PromotionGateway {
    fn default() -> Self {
        Self::new()
    }
}
