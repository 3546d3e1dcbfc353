//! Concurrent-writer serializability: many tasks mutating one job must
//! produce exactly one entry each, with no lost updates.

use std::sync::Arc;

use job_memory_core::job::OutcomeType;
use job_memory_test_utils::{decision_draft, outcome_draft, test_manager};

#[tokio::test]
async fn should_serialize_twenty_concurrent_decision_writers() {
    // Given: one job and twenty concurrent writers
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(test_manager(dir.path()).await);
    let memory = manager.initialize_job_memory("I1", "S1").await.unwrap();

    let mut handles = Vec::new();
    for n in 0..20 {
        let manager = Arc::clone(&manager);
        let job_id = memory.job_id.clone();
        handles.push(tokio::spawn(async move {
            manager
                .record_decision(
                    &job_id,
                    decision_draft(&format!("agent_{n:02}"), "arch", &format!("decision {n}")),
                )
                .await
                .map(|m| m.decisions.len())
        }));
    }

    // Then: every call succeeds and observes at least its own write
    let mut observed = Vec::new();
    for handle in handles {
        let len = handle.await.unwrap().unwrap();
        assert!(len >= 1);
        observed.push(len);
    }

    // Each acknowledged state contains no fewer decisions than were
    // acknowledged before it; the final record has exactly twenty distinct
    // entries and all twenty agents.
    let record = manager.get_job_memory(&memory.job_id).await.unwrap().unwrap();
    assert_eq!(record.decisions.len(), 20);

    let ids: std::collections::HashSet<&str> =
        record.decisions.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids.len(), 20);

    assert_eq!(record.metadata.agent_types.len(), 20);
    for n in 0..20 {
        let agent = format!("agent_{n:02}");
        assert!(record.metadata.agent_types.contains(&agent));
    }
}

#[tokio::test]
async fn should_not_block_independent_jobs_on_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(test_manager(dir.path()).await);

    let a = manager.initialize_job_memory("A", "S1").await.unwrap();
    let b = manager.initialize_job_memory("B", "S1").await.unwrap();

    let mut handles = Vec::new();
    for (job_id, agent) in [(a.job_id.clone(), "alpha"), (b.job_id.clone(), "beta")] {
        for n in 0..5 {
            let manager = Arc::clone(&manager);
            let job_id = job_id.clone();
            let agent = agent.to_string();
            handles.push(tokio::spawn(async move {
                manager
                    .record_decision(
                        &job_id,
                        decision_draft(&agent, "arch", &format!("{agent} decision {n}")),
                    )
                    .await
                    .unwrap();
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let record_a = manager.get_job_memory(&a.job_id).await.unwrap().unwrap();
    let record_b = manager.get_job_memory(&b.job_id).await.unwrap().unwrap();
    assert_eq!(record_a.decisions.len(), 5);
    assert_eq!(record_b.decisions.len(), 5);
    assert_eq!(record_a.metadata.agent_types, vec!["alpha"]);
    assert_eq!(record_b.metadata.agent_types, vec!["beta"]);
}

#[tokio::test]
async fn should_survive_concurrent_mutation_and_completion() {
    // Writers race a completion; every call either lands before the
    // completion or fails cleanly on the completed job.
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(test_manager(dir.path()).await);
    let memory = manager.initialize_job_memory("RACE", "S1").await.unwrap();

    let mut writers = Vec::new();
    for n in 0..10 {
        let manager = Arc::clone(&manager);
        let job_id = memory.job_id.clone();
        writers.push(tokio::spawn(async move {
            manager
                .record_outcome(&job_id, outcome_draft(&format!("w{n}"), OutcomeType::Success))
                .await
        }));
    }

    let completer = {
        let manager = Arc::clone(&manager);
        let job_id = memory.job_id.clone();
        tokio::spawn(async move {
            manager
                .complete_job_memory(&job_id, outcome_draft("closer", OutcomeType::Success))
                .await
        })
    };

    let mut accepted = 0;
    for writer in writers {
        if writer.await.unwrap().is_ok() {
            accepted += 1;
        }
    }
    completer.await.unwrap().unwrap();

    // The final record holds the completion outcome plus every accepted
    // write; nothing is lost and nothing extra appears.
    let record = manager.get_job_memory(&memory.job_id).await.unwrap().unwrap();
    assert_eq!(record.outcomes.len(), accepted + 1);
    assert!(record.is_complete());
}
