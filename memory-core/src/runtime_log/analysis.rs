//! Performance reports and error-pattern mining over runtime log entries.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::entry::{LogLevel, RuntimeLogEntry};

/// Number of slowest events reported.
const SLOWEST_EVENTS: usize = 5;

/// One of the slowest events observed for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowEvent {
    /// Event name
    pub event: String,
    /// Reported duration in milliseconds
    pub duration_ms: f64,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
}

/// Performance summary of a job's runtime events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPerformanceReport {
    /// Job the report covers
    pub job_id: String,
    /// Total events observed
    pub total_events: usize,
    /// Mean of `data.duration` over events that report one, in milliseconds
    pub average_duration_ms: f64,
    /// Slowest events, descending by duration
    pub slowest_events: Vec<SlowEvent>,
    /// Fraction of events at error/critical level
    pub error_rate: f32,
    /// Fraction of events at warn level
    pub warning_rate: f32,
    /// Composite health score in [0,1]
    pub performance_score: f32,
    /// Prose recommendations derived from the rates
    pub recommendations: Vec<String>,
}

/// A group of error events sharing a normalized signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPatternReport {
    /// Normalized error signature
    pub signature: String,
    /// Number of matching events
    pub occurrences: usize,
    /// Earliest matching event
    pub first_seen: DateTime<Utc>,
    /// Latest matching event
    pub last_seen: DateTime<Utc>,
    /// Agents that hit the error
    pub agent_types: Vec<String>,
    /// Remediation hints keyed off the signature
    pub remediation: Vec<String>,
}

/// Build a performance report from the entries of one job.
#[must_use]
pub(super) fn performance_report(job_id: &str, entries: &[RuntimeLogEntry]) -> LogPerformanceReport {
    let total = entries.len();
    let durations: Vec<(f64, &RuntimeLogEntry)> = entries
        .iter()
        .filter_map(|e| e.duration_ms().map(|d| (d, e)))
        .collect();

    let average_duration_ms = if durations.is_empty() {
        0.0
    } else {
        durations.iter().map(|(d, _)| d).sum::<f64>() / durations.len() as f64
    };

    let mut slowest: Vec<SlowEvent> = durations
        .iter()
        .map(|(d, e)| SlowEvent {
            event: e.event.clone(),
            duration_ms: *d,
            timestamp: e.timestamp,
        })
        .collect();
    slowest.sort_by(|a, b| b.duration_ms.total_cmp(&a.duration_ms));
    slowest.truncate(SLOWEST_EVENTS);

    let errors = entries
        .iter()
        .filter(|e| e.level.rank() >= LogLevel::Error.rank())
        .count();
    let warnings = entries.iter().filter(|e| e.level == LogLevel::Warn).count();

    let (error_rate, warning_rate) = if total == 0 {
        (0.0, 0.0)
    } else {
        (errors as f32 / total as f32, warnings as f32 / total as f32)
    };

    let performance_score = (1.0 - error_rate - 0.5 * warning_rate).clamp(0.0, 1.0);

    let mut recommendations = Vec::new();
    if total == 0 {
        recommendations.push("No runtime events recorded for this job yet.".to_string());
    }
    if error_rate > 0.1 {
        recommendations.push(format!(
            "Error rate is {:.0}%; inspect the grouped error patterns for this job.",
            error_rate * 100.0
        ));
    }
    if warning_rate > 0.25 {
        recommendations.push(
            "Warning volume is high; review performance thresholds and slow operations."
                .to_string(),
        );
    }
    if average_duration_ms > 1_000.0 {
        recommendations.push(format!(
            "Average operation duration is {average_duration_ms:.0}ms; consider batching or caching."
        ));
    }
    if recommendations.is_empty() {
        recommendations.push("Runtime performance is within normal bounds.".to_string());
    }

    LogPerformanceReport {
        job_id: job_id.to_string(),
        total_events: total,
        average_duration_ms,
        slowest_events: slowest,
        error_rate,
        warning_rate,
        performance_score,
        recommendations,
    }
}

/// Group error/critical entries by normalized signature.
#[must_use]
pub(super) fn error_patterns(entries: &[RuntimeLogEntry]) -> Vec<ErrorPatternReport> {
    let mut groups: HashMap<String, Vec<&RuntimeLogEntry>> = HashMap::new();

    for entry in entries
        .iter()
        .filter(|e| e.level.rank() >= LogLevel::Error.rank())
    {
        let message = entry.error_message().unwrap_or_else(|| entry.event.clone());
        groups
            .entry(normalize_signature(&message))
            .or_default()
            .push(entry);
    }

    let mut reports: Vec<ErrorPatternReport> = groups
        .into_iter()
        .map(|(signature, group)| {
            let first_seen = group.iter().map(|e| e.timestamp).min().unwrap_or_else(Utc::now);
            let last_seen = group.iter().map(|e| e.timestamp).max().unwrap_or_else(Utc::now);
            let mut agent_types: Vec<String> = Vec::new();
            for entry in &group {
                if let Some(agent) = &entry.agent_type {
                    if !agent_types.contains(agent) {
                        agent_types.push(agent.clone());
                    }
                }
            }
            let remediation = remediation_hints(&signature);
            ErrorPatternReport {
                signature,
                occurrences: group.len(),
                first_seen,
                last_seen,
                agent_types,
                remediation,
            }
        })
        .collect();

    reports.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
    reports
}

#[allow(clippy::expect_used)]
static ENTITY_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(job|decision|gotcha|context|outcome)-[A-Za-z0-9-]+\b").expect("valid regex")
});
#[allow(clippy::expect_used)]
static HEX_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9a-fA-F]{8,}\b").expect("valid regex"));
#[allow(clippy::expect_used)]
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+").expect("valid regex"));
#[allow(clippy::expect_used)]
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"]*"|'[^']*'"#).expect("valid regex"));
#[allow(clippy::expect_used)]
static PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(/[\w.\-]+){2,}").expect("valid regex"));

/// Collapse ids, numbers, quoted literals, and paths so that repeated
/// occurrences of one failure mode share a signature.
#[must_use]
pub fn normalize_signature(message: &str) -> String {
    let s = QUOTED.replace_all(message, "<str>");
    let s = PATH.replace_all(&s, "<path>");
    let s = ENTITY_ID.replace_all(&s, "<id>");
    let s = HEX_ID.replace_all(&s, "<id>");
    let s = NUMBER.replace_all(&s, "<n>");
    s.trim().to_string()
}

fn remediation_hints(signature: &str) -> Vec<String> {
    let lower = signature.to_lowercase();
    let mut hints = Vec::new();
    if lower.contains("timeout") || lower.contains("timed out") {
        hints.push("Increase the operation deadline or add retry with backoff.".to_string());
    }
    if lower.contains("not found") {
        hints.push("Verify the referenced job and entry ids before the call.".to_string());
    }
    if lower.contains("permission") || lower.contains("denied") {
        hints.push("Check filesystem permissions under the storage base path.".to_string());
    }
    if lower.contains("corrupt") || lower.contains("parse") || lower.contains("json") {
        hints.push("Inspect the file for truncated writes and restore from archive.".to_string());
    }
    if hints.is_empty() {
        hints.push("Review recent changes to the affected operation.".to_string());
    }
    hints
}
