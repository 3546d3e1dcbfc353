//! Retention and archival: expired jobs leave the live tree, keep a
//! summarized archive copy, and drop out of the global index.

use job_memory_core::job::OutcomeType;
use job_memory_test_utils::{context_draft, outcome_draft, test_manager};

/// Backdate a finished job's `end_time` by editing its on-disk record and
/// index line, the way an operator inspecting the tree would see them.
async fn backdate_job(base: &std::path::Path, issue_id: &str, job_id: &str, days: i64) {
    let stale = (chrono::Utc::now() - chrono::Duration::days(days)).to_rfc3339();

    let memory_path = base.join("issues").join(issue_id).join("memory.json");
    let mut record: serde_json::Value =
        serde_json::from_str(&tokio::fs::read_to_string(&memory_path).await.unwrap()).unwrap();
    record["end_time"] = serde_json::json!(stale);
    tokio::fs::write(&memory_path, serde_json::to_string_pretty(&record).unwrap())
        .await
        .unwrap();

    let index_path = base.join("jobs.ndjson");
    let index = tokio::fs::read_to_string(&index_path).await.unwrap();
    let rewritten: Vec<String> = index
        .lines()
        .map(|line| {
            let mut entry: serde_json::Value = serde_json::from_str(line).unwrap();
            if entry["job_id"] == job_id {
                entry["end_time"] = serde_json::json!(stale);
            }
            serde_json::to_string(&entry).unwrap()
        })
        .collect();
    tokio::fs::write(&index_path, rewritten.join("\n") + "\n")
        .await
        .unwrap();
}

#[tokio::test]
async fn should_archive_expired_jobs_and_truncate_context() {
    // Given: a completed job with oversized context, backdated past the
    // 30-day retention window
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;

    let memory = manager.initialize_job_memory("OLD", "S1").await.unwrap();
    manager
        .record_context(
            &memory.job_id,
            context_draft("researcher", "documentation", &"x".repeat(800)),
        )
        .await
        .unwrap();
    manager
        .complete_job_memory(&memory.job_id, outcome_draft("worker", OutcomeType::Success))
        .await
        .unwrap();

    let fresh = manager.initialize_job_memory("FRESH", "S1").await.unwrap();
    manager
        .complete_job_memory(&fresh.job_id, outcome_draft("worker", OutcomeType::Success))
        .await
        .unwrap();

    backdate_job(dir.path(), "OLD", &memory.job_id, 31).await;

    // When: cleanup runs
    let summary = manager.cleanup().await.unwrap();

    // Then: the expired job is archived with truncated context, the fresh
    // one is untouched, and the index no longer lists the expired job
    assert_eq!(summary.archived_jobs, 1);

    assert!(!dir.path().join("issues/OLD/memory.json").exists());
    let archive_path = dir.path().join(format!("archive/{}.json", memory.job_id));
    assert!(archive_path.exists());

    let archived: serde_json::Value =
        serde_json::from_str(&tokio::fs::read_to_string(&archive_path).await.unwrap()).unwrap();
    let content = archived["context"][0]["content"].as_str().unwrap();
    assert_eq!(content.chars().count(), 503);
    assert!(content.ends_with("..."));

    assert!(dir.path().join("issues/FRESH/memory.json").exists());

    let index = manager.get_global_job_log().await.unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index[0].job_id, fresh.job_id);

    // A later read of the archived job returns null.
    assert!(manager.get_job_memory(&memory.job_id).await.unwrap().is_none());
}

#[tokio::test]
async fn should_compress_old_memories_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;

    let memory = manager.initialize_job_memory("OLD", "S1").await.unwrap();
    manager
        .complete_job_memory(&memory.job_id, outcome_draft("worker", OutcomeType::Success))
        .await
        .unwrap();
    backdate_job(dir.path(), "OLD", &memory.job_id, 10).await;

    // Jobs newer than the requested age survive.
    assert_eq!(manager.compress_old_memories(20).await.unwrap(), 0);
    assert!(dir.path().join("issues/OLD/memory.json").exists());

    // Jobs older than the requested age are archived.
    assert_eq!(manager.compress_old_memories(5).await.unwrap(), 1);
    assert!(!dir.path().join("issues/OLD/memory.json").exists());
    assert!(dir
        .path()
        .join(format!("archive/{}.json", memory.job_id))
        .exists());
}

#[tokio::test]
async fn should_leave_running_jobs_alone_during_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;

    manager.initialize_job_memory("LIVE", "S1").await.unwrap();
    let summary = manager.cleanup().await.unwrap();

    assert_eq!(summary.archived_jobs, 0);
    assert!(dir.path().join("issues/LIVE/memory.json").exists());
    assert_eq!(manager.get_global_job_log().await.unwrap().len(), 1);
}
