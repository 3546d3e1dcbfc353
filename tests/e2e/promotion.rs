//! Promotion through the completion path: eligibility filtering, config
//! gating, and containment of knowledge-store failures.

use job_memory_core::config::MemoryConfig;
use job_memory_core::job::{GotchaSeverity, JobStatus, OutcomeType};
use job_memory_core::manager::MemoryManager;
use job_memory_test_utils::{
    gotcha_draft, outcome_draft, resolution, test_manager, RecordingKnowledgeStore,
};

#[tokio::test]
async fn should_forward_exactly_the_qualifying_gotchas() {
    // Given: gotchas covering every eligibility boundary
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;
    let knowledge = RecordingKnowledgeStore::new();
    manager.set_knowledge_store(knowledge.clone()).await;

    let memory = manager.initialize_job_memory("I1", "S1").await.unwrap();
    let job_id = memory.job_id.clone();

    // Qualifies: critical, resolved, confidence 0.95.
    let m = manager
        .record_gotcha(&job_id, gotcha_draft("impl", GotchaSeverity::Critical, "oom in linker"))
        .await
        .unwrap();
    manager
        .resolve_gotcha(&job_id, &m.gotchas[0].id, resolution(0.95, "split the crate"))
        .await
        .unwrap();

    // Severity too low.
    let m = manager
        .record_gotcha(&job_id, gotcha_draft("impl", GotchaSeverity::Medium, "flaky test"))
        .await
        .unwrap();
    manager
        .resolve_gotcha(&job_id, &m.gotchas[1].id, resolution(0.95, "retry"))
        .await
        .unwrap();

    // Confidence too low.
    let m = manager
        .record_gotcha(&job_id, gotcha_draft("impl", GotchaSeverity::High, "race in setup"))
        .await
        .unwrap();
    manager
        .resolve_gotcha(&job_id, &m.gotchas[2].id, resolution(0.5, "sleep longer"))
        .await
        .unwrap();

    // Unresolved.
    manager
        .record_gotcha(&job_id, gotcha_draft("impl", GotchaSeverity::Critical, "mystery hang"))
        .await
        .unwrap();

    // When: the job completes
    let completed = manager
        .complete_job_memory(&job_id, outcome_draft("impl", OutcomeType::Success))
        .await
        .unwrap();

    // Then: exactly the one qualifying gotcha was forwarded
    let received = knowledge.received().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].pattern, "oom in linker");
    assert_eq!(received[0].severity, GotchaSeverity::Critical);
    assert_eq!(received[0].solution, "split the crate");
    assert_eq!(received[0].occurrences.len(), 1);
    assert!(received[0].occurrences[0].resolved);

    assert_eq!(completed.promoted_gotchas, 1);
    let index = manager.get_global_job_log().await.unwrap();
    assert_eq!(index[0].summary.promoted_gotchas, 1);
}

#[tokio::test]
async fn should_skip_promotion_when_disabled_by_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = MemoryConfig::with_base_path(dir.path());
    config.log.flush_interval_ms = 0;
    config.auto_promote_gotchas = false;
    let manager = MemoryManager::new(config);
    manager.initialize().await.unwrap();

    let knowledge = RecordingKnowledgeStore::new();
    manager.set_knowledge_store(knowledge.clone()).await;

    let memory = manager.initialize_job_memory("I1", "S1").await.unwrap();
    let m = manager
        .record_gotcha(
            &memory.job_id,
            gotcha_draft("impl", GotchaSeverity::Critical, "oom in linker"),
        )
        .await
        .unwrap();
    manager
        .resolve_gotcha(&memory.job_id, &m.gotchas[0].id, resolution(0.95, "split"))
        .await
        .unwrap();
    manager
        .complete_job_memory(&memory.job_id, outcome_draft("impl", OutcomeType::Success))
        .await
        .unwrap();

    assert!(knowledge.received().await.is_empty());
}

#[tokio::test]
async fn should_not_fail_completion_when_the_store_rejects() {
    // Given: a knowledge store that rejects the first pattern
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;
    let knowledge = RecordingKnowledgeStore::rejecting("rejected pattern");
    manager.set_knowledge_store(knowledge.clone()).await;

    let memory = manager.initialize_job_memory("I1", "S1").await.unwrap();
    let job_id = memory.job_id.clone();

    let m = manager
        .record_gotcha(&job_id, gotcha_draft("impl", GotchaSeverity::Critical, "rejected pattern"))
        .await
        .unwrap();
    manager
        .resolve_gotcha(&job_id, &m.gotchas[0].id, resolution(0.9, "fix a"))
        .await
        .unwrap();

    let m = manager
        .record_gotcha(&job_id, gotcha_draft("impl", GotchaSeverity::Critical, "accepted pattern"))
        .await
        .unwrap();
    manager
        .resolve_gotcha(&job_id, &m.gotchas[1].id, resolution(0.9, "fix b"))
        .await
        .unwrap();

    // When: completion triggers promotion
    let completed = manager
        .complete_job_memory(&job_id, outcome_draft("impl", OutcomeType::Success))
        .await
        .unwrap();

    // Then: the completion itself succeeded and the surviving gotcha was
    // still delivered
    assert_eq!(completed.status, JobStatus::Completed);
    let received = knowledge.received().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].pattern, "accepted pattern");
    assert_eq!(completed.promoted_gotchas, 1);
}
