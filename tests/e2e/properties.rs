//! Property tests: JSON round-trip of well-formed records and archival
//! truncation edges.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use job_memory_core::job::{
    ComplexityLevel, ContextEntry, Decision, DecisionOption, Gotcha, GotchaResolution,
    GotchaSeverity, JobMemory, JobStatus, Outcome, OutcomeMetrics, OutcomeType,
};
use job_memory_test_utils::{context_draft, outcome_draft, test_manager};

fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    // Seconds across several decades, always representable.
    (0i64..2_000_000_000).prop_map(|s| Utc.timestamp_opt(s, 0).single().unwrap())
}

fn arb_severity() -> impl Strategy<Value = GotchaSeverity> {
    prop_oneof![
        Just(GotchaSeverity::Low),
        Just(GotchaSeverity::Medium),
        Just(GotchaSeverity::High),
        Just(GotchaSeverity::Critical),
    ]
}

fn arb_outcome_type() -> impl Strategy<Value = OutcomeType> {
    prop_oneof![
        Just(OutcomeType::Success),
        Just(OutcomeType::Failure),
        Just(OutcomeType::Partial),
    ]
}

fn arb_decision() -> impl Strategy<Value = Decision> {
    (
        "[a-z0-9 ]{0,40}",
        "[a-z]{1,12}",
        arb_timestamp(),
        proptest::bool::ANY,
    )
        .prop_map(|(description, category, timestamp, selected)| Decision {
            id: format!("decision-1-{category}"),
            timestamp,
            agent_type: "planner".to_string(),
            category,
            description,
            reasoning: "because".to_string(),
            options: vec![DecisionOption {
                name: "only".to_string(),
                pros: vec![],
                cons: vec![],
                selected,
            }],
            outcome: None,
        })
}

fn arb_gotcha() -> impl Strategy<Value = Gotcha> {
    (
        "[a-z0-9 ]{0,40}",
        arb_severity(),
        arb_timestamp(),
        proptest::option::of((0.0f32..=1.0, arb_timestamp())),
    )
        .prop_map(|(description, severity, timestamp, resolution)| Gotcha {
            id: "gotcha-1-abc".to_string(),
            timestamp,
            agent_type: "builder".to_string(),
            severity,
            category: "integration".to_string(),
            description,
            error_pattern: "pattern".to_string(),
            context: String::new(),
            prevention_notes: vec![],
            resolution: resolution.map(|(confidence, ts)| GotchaResolution {
                resolved: true,
                resolution_time: 5.0,
                solution: "fix".to_string(),
                prevention_steps: vec![],
                confidence,
                timestamp: ts,
            }),
        })
}

fn arb_context() -> impl Strategy<Value = ContextEntry> {
    ("[a-zA-Z0-9 ]{0,600}", 0.0f32..=1.0, arb_timestamp()).prop_map(
        |(content, relevance_score, timestamp)| ContextEntry {
            id: "context-1-abc".to_string(),
            timestamp,
            agent_type: "researcher".to_string(),
            entry_type: "documentation".to_string(),
            source: "card".to_string(),
            content,
            relevance_score,
            usage: vec![],
        },
    )
}

fn arb_outcome() -> impl Strategy<Value = Outcome> {
    (arb_outcome_type(), arb_timestamp()).prop_map(|(outcome_type, timestamp)| Outcome {
        id: "outcome-1-abc".to_string(),
        timestamp,
        agent_type: "finisher".to_string(),
        outcome_type,
        category: "delivery".to_string(),
        description: String::new(),
        metrics: OutcomeMetrics::default(),
        related_decisions: vec![],
        related_gotchas: vec![],
        lessons: vec![],
    })
}

fn arb_memory() -> impl Strategy<Value = JobMemory> {
    (
        proptest::collection::vec(arb_decision(), 0..4),
        proptest::collection::vec(arb_gotcha(), 0..4),
        proptest::collection::vec(arb_context(), 0..3),
        proptest::collection::vec(arb_outcome(), 0..4),
        arb_timestamp(),
        prop_oneof![
            Just(JobStatus::Running),
            Just(JobStatus::Completed),
            Just(JobStatus::Failed)
        ],
    )
        .prop_map(|(decisions, gotchas, context, outcomes, start_time, status)| {
            let mut memory = JobMemory::new(
                "job-PROP-1700000000000-abcdef".to_string(),
                "PROP".to_string(),
                "S1".to_string(),
            );
            memory.start_time = start_time;
            memory.status = status;
            if status != JobStatus::Running {
                memory.end_time = Some(start_time + chrono::Duration::minutes(5));
                memory.metadata.total_duration = Some(5);
            }
            memory.decisions = decisions;
            memory.gotchas = gotchas;
            memory.context = context;
            memory.outcomes = outcomes;
            memory.metadata.complexity = ComplexityLevel::Medium;
            memory.metadata.agent_types = memory.agent_types_from_entries();
            memory
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// save(x); y = load(id(x)); y == x, through the JSON representation
    /// the store writes.
    #[test]
    fn roundtrip_preserves_well_formed_records(memory in arb_memory()) {
        let json = serde_json::to_string_pretty(&memory).unwrap();
        let revived: JobMemory = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(revived, memory);
    }

    /// Index lines survive the single-line NDJSON representation.
    #[test]
    fn global_entry_roundtrips_as_ndjson(memory in arb_memory()) {
        let entry = job_memory_core::GlobalJobEntry::from_memory(&memory);
        let line = serde_json::to_string(&entry).unwrap();
        prop_assert!(!line.contains('\n'));
        let revived: job_memory_core::GlobalJobEntry = serde_json::from_str(&line).unwrap();
        prop_assert_eq!(revived, entry);
    }
}

#[tokio::test]
async fn archival_truncates_only_over_limit_content() {
    let dir = tempfile::tempdir().unwrap();
    let manager = test_manager(dir.path()).await;

    // Lengths straddling the 500-character truncation limit.
    for (issue, len) in [("A", 0usize), ("B", 499), ("C", 500), ("D", 501), ("E", 800)] {
        let memory = manager.initialize_job_memory(issue, "S1").await.unwrap();
        manager
            .record_context(
                &memory.job_id,
                context_draft("researcher", "documentation", &"x".repeat(len)),
            )
            .await
            .unwrap();
        manager
            .complete_job_memory(&memory.job_id, outcome_draft("worker", OutcomeType::Success))
            .await
            .unwrap();
        manager.archive_job_memory(&memory.job_id).await.unwrap();

        let archived: serde_json::Value = serde_json::from_str(
            &tokio::fs::read_to_string(dir.path().join(format!("archive/{}.json", memory.job_id)))
                .await
                .unwrap(),
        )
        .unwrap();
        let content = archived["context"][0]["content"].as_str().unwrap();

        if len > 500 {
            assert_eq!(content.chars().count(), 503, "length {len}");
            assert!(content.ends_with("..."), "length {len}");
            assert!(content.starts_with(&"x".repeat(500)), "length {len}");
        } else {
            assert_eq!(content.chars().count(), len, "length {len}");
        }
    }
}
