//! Idempotent initialization of the memory layer.

use serde_json::json;
use tracing::info;

use crate::error::Result;

use super::MemoryManager;

impl MemoryManager {
    /// Create the directory tree and bring the runtime log and analytics
    /// engine up, in parallel. Calling this more than once is a no-op; the
    /// resulting directory tree and façade state are identical either way.
    pub async fn initialize(&self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }

        self.store().layout().ensure_directories().await?;

        let (log_ready, analytics_ready) =
            futures::join!(self.runtime_log().initialize(), self.analytics().initialize());
        log_ready?;
        analytics_ready?;

        self.mark_initialized();

        self.runtime_log()
            .info(
                "memory_manager_initialized",
                json!({
                    "base_path": self.config().storage_base_path.display().to_string(),
                    "analytics_enabled": self.config().analytics_enabled,
                    "auto_promote_gotchas": self.config().auto_promote_gotchas,
                }),
            )
            .await;
        info!(base_path = %self.config().storage_base_path.display(), "memory layer initialized");
        Ok(())
    }
}
