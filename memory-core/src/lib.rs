#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::module_name_repetitions)]

//! # Job Memory Core
//!
//! Job memory and analytics layer for an autonomous agent orchestration
//! platform. For every unit of work tied to an external issue, this crate
//! captures a complete, queryable record of decisions taken, pitfalls
//! encountered, contextual artifacts consumed, and final outcomes, then
//! analyzes the corpus across jobs to extract success and failure patterns,
//! compute efficiency metrics, and promote reusable learnings to an
//! external knowledge store.
//!
//! ## Components
//!
//! - [`manager::MemoryManager`]: single entry point; enforces
//!   initialization, instruments every operation, drives promotion
//! - [`job_store::JobMemoryStore`]: crash-safe per-job persistence with
//!   per-job FIFO locking and a global NDJSON index
//! - [`runtime_log::RuntimeLogger`]: buffered structured event log with
//!   rotation, retention, and filtered replay
//! - [`analytics::AnalyticsEngine`]: cross-job patterns, similarity,
//!   trends, prediction, agent comparison
//! - [`promotion`]: the outbound knowledge-store contract for resolved
//!   high-confidence gotchas
//!
//! ## Quick Start
//!
//! ```no_run
//! use job_memory_core::config::MemoryConfig;
//! use job_memory_core::job::{GotchaResolution, GotchaSeverity, OutcomeMetrics, OutcomeType};
//! use job_memory_core::job_store::{NewGotcha, NewOutcome};
//! use job_memory_core::manager::MemoryManager;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = MemoryManager::new(MemoryConfig::with_base_path("/tmp/job-memory"));
//!     manager.initialize().await?;
//!
//!     // 1. Start a job for an issue
//!     let memory = manager.initialize_job_memory("ISSUE1042", "session_7").await?;
//!
//!     // 2. Record what happens during the job
//!     let memory = manager
//!         .record_gotcha(
//!             &memory.job_id,
//!             NewGotcha {
//!                 agent_type: "implementer".to_string(),
//!                 severity: GotchaSeverity::High,
//!                 category: "build".to_string(),
//!                 description: "circular dependency between workers".to_string(),
//!                 error_pattern: "circular dep".to_string(),
//!                 context: "workspace build".to_string(),
//!                 prevention_notes: vec![],
//!             },
//!         )
//!         .await?;
//!
//!     let gotcha_id = memory.gotchas[0].id.clone();
//!     manager
//!         .resolve_gotcha(
//!             &memory.job_id,
//!             &gotcha_id,
//!             GotchaResolution {
//!                 resolved: true,
//!                 resolution_time: 12.0,
//!                 solution: "inject the dependency".to_string(),
//!                 prevention_steps: vec!["layer the crates".to_string()],
//!                 confidence: 0.9,
//!                 timestamp: chrono::Utc::now(),
//!             },
//!         )
//!         .await?;
//!
//!     // 3. Complete: classifies the status, derives analytics, promotes
//!     //    qualifying gotchas to the attached knowledge store
//!     manager
//!         .complete_job_memory(
//!             &memory.job_id,
//!             NewOutcome {
//!                 agent_type: "implementer".to_string(),
//!                 outcome_type: OutcomeType::Success,
//!                 category: "delivery".to_string(),
//!                 description: "feature shipped".to_string(),
//!                 metrics: OutcomeMetrics::default(),
//!                 related_decisions: vec![],
//!                 related_gotchas: vec![gotcha_id],
//!                 lessons: vec!["layering avoids cycles".to_string()],
//!             },
//!         )
//!         .await?;
//!
//!     manager.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod config;
pub mod error;
pub mod job;
pub mod job_store;
pub mod manager;
pub mod promotion;
pub mod runtime_log;
pub mod store;

// Re-export the types callers touch most.
pub use analytics::{
    AgentPerformance, AnalyticsEngine, JobPattern, MemoryInsights, OutcomePrediction,
    PatternQuery, SimilarJob, TrendReport,
};
pub use config::{LogConfig, MemoryConfig, PerformanceThresholds};
pub use error::{Error, Result};
pub use job::{
    ComplexityLevel, ContextEntry, Decision, GlobalJobEntry, Gotcha, GotchaResolution,
    GotchaSeverity, JobAnalytics, JobMemory, JobMetadata, JobStatus, JobSummary, Outcome,
    OutcomeType, PatternKind, PatternMatch, TimeRange,
};
pub use job_store::{
    JobMemoryStore, JobMemoryUpdate, JobStatistics, NewContext, NewContextUsage, NewDecision,
    NewGotcha, NewOutcome,
};
pub use manager::MemoryManager;
pub use promotion::{GotchaPattern, KnowledgeStore, PromotionGateway};
pub use runtime_log::{LogFilter, LogLevel, RuntimeLogEntry, RuntimeLogger};
