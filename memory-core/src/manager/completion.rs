//! Job completion: finalize the record, then derive analytics and promote
//! gotchas. Failures after a successful completion are contained: logged
//! at `warn`, never propagated.

use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::job::JobMemory;
use crate::job_store::{AnalyticsPatch, JobMemoryUpdate, NewOutcome};
use crate::runtime_log::LogLevel;

use super::MemoryManager;

impl MemoryManager {
    /// Finalize a job. The store classifies the status and sets the end
    /// time; afterwards, if analytics is enabled the derived analytics
    /// block is written back onto the record, and if auto-promotion is
    /// enabled and a knowledge store is attached the qualifying gotchas
    /// are forwarded. Analytics or promotion failures do not fail the
    /// completion.
    pub async fn complete_job_memory(
        &self,
        job_id: &str,
        final_outcome: NewOutcome,
    ) -> Result<JobMemory> {
        self.ensure_initialized()?;

        let correlation_id = Uuid::new_v4().to_string();
        let started = std::time::Instant::now();

        self.runtime_log()
            .log_with(
                LogLevel::Info,
                "job_memory_complete_started",
                json!({ "job_id": job_id }),
                None,
                Some(correlation_id.clone()),
            )
            .await;

        let mut memory = match self.store().complete_job_memory(job_id, final_outcome).await {
            Ok(memory) => memory,
            Err(e) => {
                let elapsed = started.elapsed().as_millis() as u64;
                self.runtime_log()
                    .log_with(
                        LogLevel::Error,
                        "job_memory_complete_failed",
                        json!({
                            "job_id": job_id,
                            "error": e.to_string(),
                            "duration": elapsed,
                        }),
                        None,
                        Some(correlation_id),
                    )
                    .await;
                return Err(e);
            }
        };
        self.warn_if_slow("job_memory_complete", Some(job_id), started.elapsed().as_millis() as u64)
            .await;

        if self.config().analytics_enabled {
            memory = self.apply_post_completion_analytics(memory).await;
        }

        let mut promoted = 0;
        if self.config().auto_promote_gotchas && self.gateway().is_attached().await {
            promoted = self.gateway().promote_job_gotchas(&memory).await;
            if promoted > 0 {
                match self
                    .store()
                    .update_job_memory(
                        &memory.job_id,
                        JobMemoryUpdate {
                            promoted_gotchas: Some(promoted),
                            ..JobMemoryUpdate::default()
                        },
                    )
                    .await
                {
                    Ok(updated) => memory = updated,
                    Err(e) => {
                        warn!(job_id, error = %e, "failed to record promotion count on the job");
                    }
                }
            }
        }

        self.runtime_log()
            .log_with(
                LogLevel::Info,
                "job_memory_completed",
                json!({
                    "job_id": memory.job_id,
                    "status": memory.status.to_string(),
                    "duration_minutes": memory.metadata.total_duration,
                    "promoted_gotchas": promoted,
                }),
                None,
                Some(correlation_id),
            )
            .await;

        Ok(memory)
    }

    /// Derive the analytics block and write it back onto the completed
    /// record. Any failure is contained.
    async fn apply_post_completion_analytics(&self, memory: JobMemory) -> JobMemory {
        let job_id = memory.job_id.clone();
        match self.analytics().calculate_job_analytics(&job_id).await {
            Ok(analytics) => {
                match self
                    .store()
                    .update_job_memory(
                        &job_id,
                        JobMemoryUpdate {
                            analytics: Some(AnalyticsPatch::replace(analytics)),
                            ..JobMemoryUpdate::default()
                        },
                    )
                    .await
                {
                    Ok(updated) => updated,
                    Err(e) => {
                        warn!(job_id, error = %e, "failed to persist post-completion analytics");
                        self.runtime_log()
                            .warn(
                                "post_completion_analytics_failed",
                                json!({ "job_id": job_id, "error": e.to_string() }),
                            )
                            .await;
                        memory
                    }
                }
            }
            Err(e) => {
                warn!(job_id, error = %e, "post-completion analytics failed");
                self.runtime_log()
                    .warn(
                        "post_completion_analytics_failed",
                        json!({ "job_id": job_id, "error": e.to_string() }),
                    )
                    .await;
                memory
            }
        }
    }
}
