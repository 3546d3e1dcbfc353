//! Memory manager façade.
//!
//! Single entry point over the store, runtime log, analytics engine, and
//! promotion gateway. Enforces initialization order, instruments every
//! mutating operation with runtime-log events and performance-threshold
//! warnings, and drives post-completion analytics and gotcha promotion.

mod completion;
mod init;
mod maintenance;
mod ops;

pub use maintenance::CleanupSummary;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::analytics::AnalyticsEngine;
use crate::config::MemoryConfig;
use crate::error::{Error, Result};
use crate::job_store::JobMemoryStore;
use crate::promotion::{KnowledgeStore, PromotionGateway};
use crate::runtime_log::RuntimeLogger;

/// Lifecycle coordinator and single public entry point of the memory layer.
pub struct MemoryManager {
    config: MemoryConfig,
    store: Arc<JobMemoryStore>,
    logger: RuntimeLogger,
    analytics: AnalyticsEngine,
    gateway: PromotionGateway,
    initialized: AtomicBool,
}

impl MemoryManager {
    /// Build a manager over the configured base path. Construction is
    /// cheap and does no I/O; call [`initialize`](MemoryManager::initialize)
    /// before the first mutating operation.
    #[must_use]
    pub fn new(config: MemoryConfig) -> Self {
        let store = Arc::new(JobMemoryStore::new(config.clone()));
        let logger = RuntimeLogger::new(store.layout(), config.log.clone());
        let analytics = AnalyticsEngine::new(
            Arc::clone(&store),
            config.performance_thresholds.clone(),
        );
        Self {
            config,
            store,
            logger,
            analytics,
            gateway: PromotionGateway::new(),
            initialized: AtomicBool::new(false),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Whether [`initialize`](MemoryManager::initialize) has succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// The runtime logger, for session context and log retrieval.
    #[must_use]
    pub fn runtime_log(&self) -> &RuntimeLogger {
        &self.logger
    }

    /// The analytics engine.
    #[must_use]
    pub fn analytics(&self) -> &AnalyticsEngine {
        &self.analytics
    }

    /// Attach the external knowledge store used for gotcha promotion.
    pub async fn set_knowledge_store(&self, store: Arc<dyn KnowledgeStore>) {
        self.gateway.attach(store).await;
    }

    pub(crate) fn store(&self) -> &Arc<JobMemoryStore> {
        &self.store
    }

    pub(crate) fn gateway(&self) -> &PromotionGateway {
        &self.gateway
    }

    pub(crate) fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    /// Fail with `NotInitialized` unless initialization has succeeded.
    pub(crate) fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }
}
