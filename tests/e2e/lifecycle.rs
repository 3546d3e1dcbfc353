//! End-to-end lifecycle scenarios: happy path, completion classification,
//! and global-log consistency.

use job_memory_core::job::{GotchaSeverity, JobStatus, OutcomeType};
use job_memory_test_utils::{
    decision_draft, gotcha_draft, outcome_draft, resolution, test_manager, RecordingKnowledgeStore,
};

#[tokio::test]
async fn should_run_happy_path_from_init_to_promotion() {
    // Given: an initialized manager with a knowledge store attached
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;
    let knowledge = RecordingKnowledgeStore::new();
    manager.set_knowledge_store(knowledge.clone()).await;

    // When: a job records a decision, hits and resolves a gotcha, completes
    let memory = manager.initialize_job_memory("I1", "S1").await.unwrap();
    assert_eq!(memory.status, JobStatus::Running);

    manager
        .record_decision(&memory.job_id, decision_draft("planner", "arch", "use X"))
        .await
        .unwrap();
    let after = manager
        .record_gotcha(
            &memory.job_id,
            gotcha_draft("impl", GotchaSeverity::High, "circular dep"),
        )
        .await
        .unwrap();
    let gotcha_id = after.gotchas[0].id.clone();

    manager
        .resolve_gotcha(&memory.job_id, &gotcha_id, resolution(0.9, "inject"))
        .await
        .unwrap();

    let completed = manager
        .complete_job_memory(&memory.job_id, outcome_draft("impl", OutcomeType::Success))
        .await
        .unwrap();

    // Then: status, agent tracking, promotion, and the global entry line up
    assert_eq!(completed.status, JobStatus::Completed);
    assert_eq!(completed.metadata.agent_types, vec!["planner", "impl"]);
    assert!(completed.end_time.is_some());
    assert!(completed.metadata.total_duration.unwrap() >= 1);

    let promoted = knowledge.received().await;
    assert_eq!(promoted.len(), 1);
    assert_eq!(promoted[0].pattern, "circular dep");
    assert_eq!(promoted[0].occurrences[0].issue_id, "I1");

    let index = manager.get_global_job_log().await.unwrap();
    assert_eq!(index.len(), 1);
    assert!(index[0].success);
    assert_eq!(index[0].status, JobStatus::Completed);
    assert_eq!(index[0].summary.decisions, 1);
    assert_eq!(index[0].summary.gotchas, 1);
    assert_eq!(index[0].summary.resolved_gotchas, 1);
    assert_eq!(index[0].summary.promoted_gotchas, 1);

    // Analytics was written back onto the record.
    let reloaded = manager.get_job_memory(&memory.job_id).await.unwrap().unwrap();
    assert!(reloaded.analytics.learning_score > 0.0);
    assert!(reloaded.analytics.learning_score <= 1.0);

    manager.shutdown().await;
}

#[tokio::test]
async fn should_fail_job_when_successes_do_not_outnumber_failures() {
    // Given: a job with one success and two failures already recorded
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;
    let memory = manager.initialize_job_memory("I2", "S1").await.unwrap();

    for outcome_type in [OutcomeType::Success, OutcomeType::Failure, OutcomeType::Failure] {
        manager
            .record_outcome(&memory.job_id, outcome_draft("worker", outcome_type))
            .await
            .unwrap();
    }

    // When: completion adds a final success, making the tally 2 vs 2
    let completed = manager
        .complete_job_memory(&memory.job_id, outcome_draft("worker", OutcomeType::Success))
        .await
        .unwrap();

    // Then: a tie is not a strict majority
    assert_eq!(completed.status, JobStatus::Failed);

    let index = manager.get_global_job_log().await.unwrap();
    assert!(!index[0].success);
    assert_eq!(index[0].summary.outcomes, 4);
    assert_eq!(index[0].summary.successful_outcomes, 2);
}

#[tokio::test]
async fn should_return_null_for_unknown_job_and_reject_unknown_entries() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;

    assert!(manager
        .get_job_memory("job-I9-0-zzzzzz")
        .await
        .unwrap()
        .is_none());

    let memory = manager.initialize_job_memory("I3", "S1").await.unwrap();
    let err = manager
        .resolve_gotcha(&memory.job_id, "gotcha-0-missing", resolution(0.9, "n/a"))
        .await
        .unwrap_err();
    assert!(matches!(err, job_memory_core::Error::NotFound(_)));
}

#[tokio::test]
async fn should_keep_job_id_immutable_through_updates() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;
    let memory = manager.initialize_job_memory("I4", "S1").await.unwrap();

    let err = manager
        .update_job_memory(
            &memory.job_id,
            job_memory_core::JobMemoryUpdate {
                job_id: Some("job-I4-0-other0".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, job_memory_core::Error::Conflict(_)));

    let unchanged = manager.get_job_memory(&memory.job_id).await.unwrap().unwrap();
    assert_eq!(unchanged.job_id, memory.job_id);
}
