//! Runtime-log scenarios: filtered retrieval, ordering, performance
//! analysis, and error-pattern grouping through the façade.

use job_memory_core::job::OutcomeType;
use job_memory_core::runtime_log::{LogFilter, LogLevel};
use job_memory_test_utils::{outcome_draft, test_manager};
use serde_json::json;

#[tokio::test]
async fn should_return_only_the_error_entry_for_level_and_error_filter() {
    // Given: one info, one warn, one error event for job J
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;
    let log = manager.runtime_log();

    log.set_session_context("S1", Some("J".to_string()), None).await;
    log.info("step_done", json!({})).await;
    log.warn("step_slow", json!({})).await;
    log.error("step_failed", json!({"error": "io failure"})).await;

    // When: retrieval filters on error levels plus the error payload
    let filter = LogFilter {
        levels: Some(vec![LogLevel::Error, LogLevel::Critical]),
        has_error: Some(true),
        ..LogFilter::default()
    };
    let entries = log.get_logs_for_job("J", Some(&filter)).await.unwrap();

    // Then: exactly the error entry comes back
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].event, "step_failed");
    assert_eq!(entries[0].level, LogLevel::Error);
}

#[tokio::test]
async fn should_emit_events_for_facade_operations_in_timestamp_order() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;

    let memory = manager.initialize_job_memory("I1", "S1").await.unwrap();
    manager
        .runtime_log()
        .set_session_context("S1", Some(memory.job_id.clone()), None)
        .await;
    manager
        .complete_job_memory(&memory.job_id, outcome_draft("worker", OutcomeType::Success))
        .await
        .unwrap();

    let entries = manager
        .runtime_log()
        .get_logs_for_job(&memory.job_id, None)
        .await
        .unwrap();

    // The completion emitted begin and end events sharing a correlation id.
    let started: Vec<_> = entries
        .iter()
        .filter(|e| e.event == "job_memory_complete_started")
        .collect();
    let finished: Vec<_> = entries
        .iter()
        .filter(|e| e.event == "job_memory_completed")
        .collect();
    assert_eq!(started.len(), 1);
    assert_eq!(finished.len(), 1);
    assert_eq!(started[0].correlation_id, finished[0].correlation_id);

    for pair in entries.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

#[tokio::test]
async fn should_log_failed_operations_with_error_payload() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;
    manager
        .runtime_log()
        .set_session_context("S1", Some("job-I9-0-zzzzzz".to_string()), None)
        .await;

    let err = manager
        .complete_job_memory(
            "job-I9-0-zzzzzz",
            outcome_draft("worker", OutcomeType::Success),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, job_memory_core::Error::NotFound(_)));

    let failures = manager
        .runtime_log()
        .get_logs_for_job(
            "job-I9-0-zzzzzz",
            Some(&LogFilter {
                has_error: Some(true),
                ..LogFilter::default()
            }),
        )
        .await
        .unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].event, "job_memory_complete_failed");
    assert!(failures[0]
        .data
        .get("error")
        .unwrap()
        .as_str()
        .unwrap()
        .contains("job-I9-0-zzzzzz"));
}

#[tokio::test]
async fn should_group_error_patterns_and_report_performance() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;
    let log = manager.runtime_log();
    log.set_session_context("S1", Some("J".to_string()), Some("builder".to_string()))
        .await;

    log.info("op_done", json!({"duration": 120.0})).await;
    log.info("op_done", json!({"duration": 40.0})).await;
    log.error("op_failed", json!({"error": "timeout after 5s"})).await;
    log.error("op_failed", json!({"error": "timeout after 9s"})).await;

    let report = log.analyze_performance("J").await.unwrap();
    assert_eq!(report.total_events, 4);
    assert!((report.average_duration_ms - 80.0).abs() < 1e-6);
    assert!(report.error_rate > 0.0);
    assert!(!report.slowest_events.is_empty());
    assert_eq!(report.slowest_events[0].duration_ms, 120.0);
    assert!(!report.recommendations.is_empty());

    let patterns = log.find_error_patterns(Some("builder"), None).await.unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].occurrences, 2);
    assert!(patterns[0].first_seen <= patterns[0].last_seen);
    assert!(!patterns[0].remediation.is_empty());

    assert!(log
        .find_error_patterns(Some("nobody"), None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn should_survive_rotation_and_read_across_files() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;
    let log = manager.runtime_log();
    log.set_session_context("S1", Some("J".to_string()), None).await;

    log.info("before_rotation", json!({})).await;
    log.rotate_logs().await.unwrap();
    log.info("after_rotation", json!({})).await;

    let entries = log.get_logs_for_job("J", None).await.unwrap();
    let events: Vec<&str> = entries.iter().map(|e| e.event.as_str()).collect();
    assert!(events.contains(&"before_rotation"));
    assert!(events.contains(&"after_rotation"));
}
