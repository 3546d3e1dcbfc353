//! Cross-job pattern mining through the façade: minimum support, search,
//! similarity, prediction, and trends.

use job_memory_core::job::{JobMemory, OutcomeType, PatternKind, TimeRange};
use job_memory_core::PatternQuery;
use job_memory_test_utils::{decision_draft, outcome_draft, test_manager};

async fn completed_job_with_category(
    manager: &job_memory_core::MemoryManager,
    issue: &str,
    category: &str,
) -> String {
    let memory = manager.initialize_job_memory(issue, "S1").await.unwrap();
    manager
        .record_decision(
            &memory.job_id,
            decision_draft("planner", category, "take the well-worn path"),
        )
        .await
        .unwrap();
    manager
        .complete_job_memory(&memory.job_id, outcome_draft("worker", OutcomeType::Success))
        .await
        .unwrap();
    memory.job_id
}

async fn load_all_jobs(manager: &job_memory_core::MemoryManager) -> Vec<JobMemory> {
    let mut jobs = Vec::new();
    for entry in manager.get_global_job_log().await.unwrap() {
        if let Some(memory) = manager.get_job_memory(&entry.job_id).await.unwrap() {
            jobs.push(memory);
        }
    }
    jobs
}

#[tokio::test]
async fn should_require_three_jobs_before_reporting_a_pattern() {
    // Given: two successful jobs sharing a decision category
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;
    completed_job_with_category(&manager, "A", "arch").await;
    completed_job_with_category(&manager, "B", "arch").await;

    // Then: support 2 < 3 yields no pattern
    let jobs = load_all_jobs(&manager).await;
    assert!(manager.identify_success_patterns(&jobs).is_empty());

    // When: a third matching job completes
    completed_job_with_category(&manager, "C", "arch").await;

    // Then: one pattern with occurrences >= 3 and confidence >= 0.7
    let jobs = load_all_jobs(&manager).await;
    let patterns = manager.identify_success_patterns(&jobs);
    assert_eq!(patterns.len(), 1);
    assert!(patterns[0].occurrences() >= 3);
    assert!(patterns[0].confidence() >= 0.7);
}

#[tokio::test]
async fn should_search_patterns_with_filters_and_cap() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;
    for issue in ["A", "B", "C"] {
        completed_job_with_category(&manager, issue, "arch").await;
    }
    for issue in ["D", "E", "F"] {
        completed_job_with_category(&manager, issue, "testing").await;
    }

    let all = manager
        .search_similar_patterns(&PatternQuery::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|m| m.pattern_type == PatternKind::Success));
    assert!(all.iter().all(|m| m.confidence >= 0.7));

    let capped = manager
        .search_similar_patterns(&PatternQuery {
            max_results: Some(1),
            ..PatternQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(capped.len(), 1);

    // Failure-only search over a corpus with no failures is empty, not an
    // error.
    let none = manager
        .search_similar_patterns(&PatternQuery {
            pattern_type: Some(PatternKind::Failure),
            ..PatternQuery::default()
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn should_find_similar_jobs_above_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;

    let a = completed_job_with_category(&manager, "A", "arch").await;
    let b = completed_job_with_category(&manager, "B", "arch").await;

    let similar = manager.find_similar_jobs(&a).await.unwrap();
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].job_id, b);
    assert!(similar[0].similarity >= 0.6);
    assert!(similar[0].similarity <= 1.0);
}

#[tokio::test]
async fn should_predict_outcomes_and_bundle_insights() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;
    for issue in ["A", "B", "C"] {
        completed_job_with_category(&manager, issue, "arch").await;
    }

    let running = manager.initialize_job_memory("NEW", "S1").await.unwrap();
    let running = manager
        .record_decision(
            &running.job_id,
            decision_draft("planner", "arch", "take the well-worn path"),
        )
        .await
        .unwrap();

    let prediction = manager.predict_job_outcome(&running).await.unwrap();
    assert!(prediction.predicted_success);
    assert!((0.0..=1.0).contains(&prediction.confidence));
    assert!(prediction.estimated_duration_minutes >= 1);

    let insights = manager.get_memory_insights(&running.job_id).await.unwrap();
    assert_eq!(insights.job_id, running.job_id);
    assert!(insights.patterns.decision_categories.contains(&"arch".to_string()));
    assert!((0.0..=1.0).contains(&insights.summary.efficiency));

    let stats = manager.get_job_statistics().await.unwrap();
    assert_eq!(stats.total_jobs, 4);
    assert_eq!(stats.completed_jobs, 3);
    assert_eq!(stats.running_jobs, 1);
}

#[tokio::test]
async fn should_report_trends_only_inside_the_range() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;
    completed_job_with_category(&manager, "A", "arch").await;

    let recent = TimeRange {
        start: chrono::Utc::now() - chrono::Duration::hours(1),
        end: chrono::Utc::now() + chrono::Duration::hours(1),
    };
    let report = manager.analyze_trends(recent).await.unwrap();
    assert_eq!(report.total_jobs, 1);
    assert!((report.success_rate - 1.0).abs() < 1e-6);

    let ancient = TimeRange {
        start: chrono::Utc::now() - chrono::Duration::days(60),
        end: chrono::Utc::now() - chrono::Duration::days(30),
    };
    assert!(matches!(
        manager.analyze_trends(ancient).await.unwrap_err(),
        job_memory_core::Error::NotFound(_)
    ));
}

#[tokio::test]
async fn should_rank_agents_by_effectiveness() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;

    completed_job_with_category(&manager, "A", "arch").await;

    let failing = manager.initialize_job_memory("B", "S1").await.unwrap();
    manager
        .record_decision(
            &failing.job_id,
            decision_draft("stumbler", "arch", "take a shortcut"),
        )
        .await
        .unwrap();
    manager
        .complete_job_memory(&failing.job_id, outcome_draft("stumbler", OutcomeType::Failure))
        .await
        .unwrap();

    let ranked = manager.compare_agent_effectiveness().await.unwrap();
    assert!(ranked.len() >= 2);
    let planner_pos = ranked.iter().position(|a| a.agent_type == "planner").unwrap();
    let stumbler_pos = ranked.iter().position(|a| a.agent_type == "stumbler").unwrap();
    assert!(planner_pos < stumbler_pos);

    let ghost = manager.analyze_agent_performance("ghost").await.unwrap();
    assert_eq!(ghost.total_jobs, 0);
    assert!(ghost.success_rate.is_nan());
}
