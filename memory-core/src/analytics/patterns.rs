//! Cross-job pattern mining and pattern search.
//!
//! A pattern needs at least [`MIN_PATTERN_SUPPORT`] distinct contributing
//! jobs. Confidence grows with support from 0.7 at minimum support to 1.0
//! at ten or more jobs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use crate::job::{JobMemory, JobStatus, PatternKind, PatternMatch};
use crate::runtime_log::normalize_signature;

/// Minimum number of distinct jobs that must exhibit a structure before it
/// becomes a pattern.
pub const MIN_PATTERN_SUPPORT: usize = 3;

/// Description similarity a query must reach to match a pattern.
const DESCRIPTION_MATCH_THRESHOLD: f64 = 0.55;

/// Default cap on search results when the query sets none.
const DEFAULT_MAX_RESULTS: usize = 10;

/// A structure repeatedly observed across jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobPattern {
    /// Decision structure shared by successful jobs
    Success {
        /// Deterministic pattern id
        id: String,
        /// Human-readable description
        description: String,
        /// Confidence in [0.7, 1.0]
        confidence: f32,
        /// Distinct contributing jobs
        occurrences: usize,
        /// Conditions under which the pattern applies
        conditions: Vec<String>,
        /// Outcome categories observed with the pattern
        outcomes: Vec<String>,
        /// Agents the pattern applies to
        applicable_agents: Vec<String>,
        /// Contributing job ids
        source_jobs: Vec<String>,
    },
    /// Error structure shared by failed jobs
    Failure {
        /// Deterministic pattern id
        id: String,
        /// Human-readable description
        description: String,
        /// Confidence in [0.7, 1.0]
        confidence: f32,
        /// Distinct contributing jobs
        occurrences: usize,
        /// Error signatures that trigger the failure
        triggers: Vec<String>,
        /// Prevention steps collected from resolutions
        prevention: Vec<String>,
        /// Agents affected by the failure
        affected_agents: Vec<String>,
        /// Contributing job ids
        source_jobs: Vec<String>,
    },
}

impl JobPattern {
    /// Pattern id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            JobPattern::Success { id, .. } | JobPattern::Failure { id, .. } => id,
        }
    }

    /// Pattern kind.
    #[must_use]
    pub fn kind(&self) -> PatternKind {
        match self {
            JobPattern::Success { .. } => PatternKind::Success,
            JobPattern::Failure { .. } => PatternKind::Failure,
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            JobPattern::Success { description, .. }
            | JobPattern::Failure { description, .. } => description,
        }
    }

    /// Confidence in [0.7, 1.0].
    #[must_use]
    pub fn confidence(&self) -> f32 {
        match self {
            JobPattern::Success { confidence, .. } | JobPattern::Failure { confidence, .. } => {
                *confidence
            }
        }
    }

    /// Distinct contributing jobs.
    #[must_use]
    pub fn occurrences(&self) -> usize {
        match self {
            JobPattern::Success { occurrences, .. }
            | JobPattern::Failure { occurrences, .. } => *occurrences,
        }
    }

    /// Agents the pattern applies to / affects.
    #[must_use]
    pub fn agents(&self) -> &[String] {
        match self {
            JobPattern::Success {
                applicable_agents, ..
            } => applicable_agents,
            JobPattern::Failure {
                affected_agents, ..
            } => affected_agents,
        }
    }

    /// Contributing job ids.
    #[must_use]
    pub fn source_jobs(&self) -> &[String] {
        match self {
            JobPattern::Success { source_jobs, .. }
            | JobPattern::Failure { source_jobs, .. } => source_jobs,
        }
    }

    /// Value-copy into the persisted match representation.
    #[must_use]
    pub fn to_match(&self, confidence: f32) -> PatternMatch {
        PatternMatch {
            pattern_id: self.id().to_string(),
            pattern_type: self.kind(),
            description: self.description().to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            source_jobs: self.source_jobs().to_vec(),
        }
    }
}

/// Query for [`search_patterns`].
#[derive(Debug, Clone, Default)]
pub struct PatternQuery {
    /// Restrict to one pattern kind
    pub pattern_type: Option<PatternKind>,
    /// Fuzzy-match pattern descriptions against this text
    pub description: Option<String>,
    /// Restrict to patterns involving this agent
    pub agent_type: Option<String>,
    /// Drop patterns below this confidence
    pub min_confidence: Option<f32>,
    /// Cap the result count (default 10)
    pub max_results: Option<usize>,
}

/// Mine success patterns: decision categories shared by at least
/// [`MIN_PATTERN_SUPPORT`] distinct completed jobs.
#[must_use]
pub fn identify_success_patterns(jobs: &[JobMemory]) -> Vec<JobPattern> {
    let mut groups: BTreeMap<String, Vec<&JobMemory>> = BTreeMap::new();

    for job in jobs.iter().filter(|j| j.status == JobStatus::Completed) {
        let mut categories: Vec<String> = job
            .decisions
            .iter()
            .map(|d| d.category.to_lowercase())
            .collect();
        categories.sort_unstable();
        categories.dedup();
        for category in categories {
            groups.entry(category).or_default().push(job);
        }
    }

    groups
        .into_iter()
        .filter(|(_, group)| group.len() >= MIN_PATTERN_SUPPORT)
        .map(|(category, group)| {
            let mut outcomes = Vec::new();
            let mut agents = Vec::new();
            let mut source_jobs = Vec::new();
            for job in &group {
                source_jobs.push(job.job_id.clone());
                for outcome in &job.outcomes {
                    push_unique(&mut outcomes, outcome.category.to_lowercase());
                }
                for decision in &job.decisions {
                    if decision.category.eq_ignore_ascii_case(&category) {
                        push_unique(&mut agents, decision.agent_type.clone());
                    }
                }
            }
            JobPattern::Success {
                id: format!("success-{}", slug(&category)),
                description: format!(
                    "Jobs that work through '{category}' decisions tend to complete successfully"
                ),
                confidence: support_confidence(group.len()),
                occurrences: group.len(),
                conditions: vec![format!("decision of category '{category}' recorded")],
                outcomes,
                applicable_agents: agents,
                source_jobs,
            }
        })
        .collect()
}

/// Mine failure patterns: normalized gotcha error signatures shared by at
/// least [`MIN_PATTERN_SUPPORT`] distinct failed jobs.
#[must_use]
pub fn identify_failure_patterns(jobs: &[JobMemory]) -> Vec<JobPattern> {
    let mut groups: BTreeMap<String, Vec<&JobMemory>> = BTreeMap::new();

    for job in jobs.iter().filter(|j| j.status == JobStatus::Failed) {
        let mut signatures: Vec<String> = job
            .gotchas
            .iter()
            .map(|g| normalize_signature(&g.error_pattern))
            .filter(|s| !s.is_empty())
            .collect();
        signatures.sort_unstable();
        signatures.dedup();
        for signature in signatures {
            groups.entry(signature).or_default().push(job);
        }
    }

    groups
        .into_iter()
        .filter(|(_, group)| group.len() >= MIN_PATTERN_SUPPORT)
        .map(|(signature, group)| {
            let mut prevention = Vec::new();
            let mut agents = Vec::new();
            let mut source_jobs = Vec::new();
            for job in &group {
                source_jobs.push(job.job_id.clone());
                for gotcha in &job.gotchas {
                    if normalize_signature(&gotcha.error_pattern) != signature {
                        continue;
                    }
                    push_unique(&mut agents, gotcha.agent_type.clone());
                    for note in &gotcha.prevention_notes {
                        push_unique(&mut prevention, note.clone());
                    }
                    if let Some(resolution) = &gotcha.resolution {
                        for step in &resolution.prevention_steps {
                            push_unique(&mut prevention, step.clone());
                        }
                    }
                }
            }
            JobPattern::Failure {
                id: format!("failure-{}", slug(&signature)),
                description: format!("Jobs hitting '{signature}' tend to fail"),
                confidence: support_confidence(group.len()),
                occurrences: group.len(),
                triggers: vec![signature],
                prevention,
                affected_agents: agents,
                source_jobs,
            }
        })
        .collect()
}

/// Matches between one job and the mined corpus patterns: a success pattern
/// matches when the job records a decision of the pattern's category, a
/// failure pattern when a gotcha shares the trigger signature.
#[must_use]
pub fn pattern_matches_for(memory: &JobMemory, patterns: &[JobPattern]) -> Vec<PatternMatch> {
    let decision_categories: Vec<String> = memory
        .decisions
        .iter()
        .map(|d| d.category.to_lowercase())
        .collect();
    let signatures: Vec<String> = memory
        .gotchas
        .iter()
        .map(|g| normalize_signature(&g.error_pattern))
        .collect();

    patterns
        .iter()
        .filter(|pattern| match pattern {
            JobPattern::Success { id, .. } => decision_categories
                .iter()
                .any(|c| *id == format!("success-{}", slug(c))),
            JobPattern::Failure { triggers, .. } => triggers
                .iter()
                .any(|t| signatures.iter().any(|s| s == t)),
        })
        .map(|pattern| pattern.to_match(pattern.confidence()))
        .collect()
}

/// Apply a query against mined patterns: kind, fuzzy description, agent,
/// and confidence filters in that order, truncated to the query's cap.
/// Returns an empty list, never an error, when nothing matches.
#[must_use]
pub fn search_patterns(patterns: &[JobPattern], query: &PatternQuery) -> Vec<PatternMatch> {
    let mut matches: Vec<PatternMatch> = patterns
        .iter()
        .filter(|p| query.pattern_type.is_none_or(|kind| p.kind() == kind))
        .filter(|p| {
            query.description.as_ref().is_none_or(|text| {
                jaro_winkler(&p.description().to_lowercase(), &text.to_lowercase())
                    >= DESCRIPTION_MATCH_THRESHOLD
            })
        })
        .filter(|p| {
            query
                .agent_type
                .as_ref()
                .is_none_or(|agent| p.agents().iter().any(|a| a == agent))
        })
        .filter(|p| query.min_confidence.is_none_or(|min| p.confidence() >= min))
        .map(|p| p.to_match(p.confidence()))
        .collect();

    matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    matches.truncate(query.max_results.unwrap_or(DEFAULT_MAX_RESULTS));
    matches
}

fn support_confidence(support: usize) -> f32 {
    let extra = (support.saturating_sub(MIN_PATTERN_SUPPORT)) as f32 / 7.0;
    (0.7 + 0.3 * extra.min(1.0)).clamp(0.7, 1.0)
}

fn push_unique(target: &mut Vec<String>, item: String) {
    if !target.contains(&item) {
        target.push(item);
    }
}

fn slug(text: &str) -> String {
    let mut slug: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    while slug.contains("--") {
        slug = slug.replace("--", "-");
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Decision, Gotcha, GotchaSeverity, JobStatus};
    use chrono::Utc;

    fn completed_job(n: usize, category: &str) -> JobMemory {
        let mut memory = JobMemory::new(
            format!("job-I{n}-{n}-abc"),
            format!("I{n}"),
            "S1".to_string(),
        );
        memory.status = JobStatus::Completed;
        memory.decisions.push(Decision {
            id: format!("decision-{n}-a"),
            timestamp: Utc::now(),
            agent_type: "planner".to_string(),
            category: category.to_string(),
            description: "shared approach".to_string(),
            reasoning: String::new(),
            options: vec![],
            outcome: None,
        });
        memory.metadata.track_agent("planner");
        memory
    }

    fn failed_job(n: usize, error_pattern: &str) -> JobMemory {
        let mut memory = JobMemory::new(
            format!("job-F{n}-{n}-abc"),
            format!("F{n}"),
            "S1".to_string(),
        );
        memory.status = JobStatus::Failed;
        memory.gotchas.push(Gotcha {
            id: format!("gotcha-{n}-a"),
            timestamp: Utc::now(),
            agent_type: "builder".to_string(),
            severity: GotchaSeverity::High,
            category: "build".to_string(),
            description: String::new(),
            error_pattern: error_pattern.to_string(),
            context: String::new(),
            prevention_notes: vec!["pin the toolchain".to_string()],
            resolution: None,
        });
        memory.metadata.track_agent("builder");
        memory
    }

    #[test]
    fn test_support_below_three_yields_nothing() {
        let jobs = vec![completed_job(1, "architecture"), completed_job(2, "architecture")];
        assert!(identify_success_patterns(&jobs).is_empty());
    }

    #[test]
    fn test_support_of_three_yields_pattern() {
        let jobs = vec![
            completed_job(1, "architecture"),
            completed_job(2, "architecture"),
            completed_job(3, "architecture"),
        ];
        let patterns = identify_success_patterns(&jobs);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].occurrences(), 3);
        assert!(patterns[0].confidence() >= 0.7);
        assert_eq!(patterns[0].agents(), ["planner"]);
    }

    #[test]
    fn test_failure_patterns_group_by_signature() {
        let jobs = vec![
            failed_job(1, "toolchain mismatch at step 4"),
            failed_job(2, "toolchain mismatch at step 9"),
            failed_job(3, "toolchain mismatch at step 2"),
        ];
        let patterns = identify_failure_patterns(&jobs);
        assert_eq!(patterns.len(), 1);
        match &patterns[0] {
            JobPattern::Failure {
                triggers, prevention, ..
            } => {
                assert_eq!(triggers.len(), 1);
                assert!(prevention.contains(&"pin the toolchain".to_string()));
            }
            other => panic!("expected failure pattern, got {other:?}"),
        }
    }

    #[test]
    fn test_confidence_grows_with_support() {
        let three: Vec<JobMemory> = (0..3).map(|n| completed_job(n, "testing")).collect();
        let ten: Vec<JobMemory> = (0..10).map(|n| completed_job(n, "testing")).collect();
        let low = identify_success_patterns(&three)[0].confidence();
        let high = identify_success_patterns(&ten)[0].confidence();
        assert!((low - 0.7).abs() < 1e-6);
        assert!((high - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_filters_and_truncates() {
        let jobs: Vec<JobMemory> = (0..4)
            .map(|n| completed_job(n, "architecture"))
            .chain((4..8).map(|n| completed_job(n, "testing")))
            .collect();
        let mut patterns = identify_success_patterns(&jobs);
        patterns.extend(identify_failure_patterns(&[
            failed_job(1, "oom"),
            failed_job(2, "oom"),
            failed_job(3, "oom"),
        ]));

        let all = search_patterns(&patterns, &PatternQuery::default());
        assert_eq!(all.len(), 3);

        let failures = search_patterns(
            &patterns,
            &PatternQuery {
                pattern_type: Some(PatternKind::Failure),
                ..PatternQuery::default()
            },
        );
        assert_eq!(failures.len(), 1);

        let capped = search_patterns(
            &patterns,
            &PatternQuery {
                max_results: Some(1),
                ..PatternQuery::default()
            },
        );
        assert_eq!(capped.len(), 1);

        let none = search_patterns(
            &patterns,
            &PatternQuery {
                agent_type: Some("nobody".to_string()),
                ..PatternQuery::default()
            },
        );
        assert!(none.is_empty());
    }

    #[test]
    fn test_pattern_matches_for_job() {
        let jobs: Vec<JobMemory> = (0..3).map(|n| completed_job(n, "architecture")).collect();
        let patterns = identify_success_patterns(&jobs);

        let matching = completed_job(9, "architecture");
        let matches = pattern_matches_for(&matching, &patterns);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pattern_type, PatternKind::Success);

        let unrelated = completed_job(9, "tooling");
        assert!(pattern_matches_for(&unrelated, &patterns).is_empty());
    }
}
