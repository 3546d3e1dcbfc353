//! Runtime log entry types, context defaults, and retrieval filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::job::TimeRange;

/// Severity level for runtime log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Very fine-grained diagnostics
    Trace,
    /// Diagnostics useful during development
    Debug,
    /// Normal operational events
    #[default]
    Info,
    /// Unexpected but tolerated conditions
    Warn,
    /// Operation failures
    Error,
    /// Failures that threaten the session
    Critical,
}

impl LogLevel {
    /// Ordering rank; higher is more severe.
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            LogLevel::Trace => 0,
            LogLevel::Debug => 1,
            LogLevel::Info => 2,
            LogLevel::Warn => 3,
            LogLevel::Error => 4,
            LogLevel::Critical => 5,
        }
    }

    /// Buffered levels are held until a timed or size-triggered flush;
    /// everything `warn` and above is flushed within the emitting call.
    #[must_use]
    pub fn is_buffered(&self) -> bool {
        self.rank() < LogLevel::Warn.rank()
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            _ => Err(format!("Unknown LogLevel: {s}")),
        }
    }
}

/// Per-caller defaults stamped onto emitted entries; any field may be
/// overridden per event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogContext {
    /// Session the events belong to
    pub session_id: Option<String>,
    /// Job the events belong to, if any
    pub job_id: Option<String>,
    /// Agent emitting the events, if any
    pub agent_type: Option<String>,
}

impl LogContext {
    /// Context carrying only a session id.
    #[must_use]
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            job_id: None,
            agent_type: None,
        }
    }
}

/// One structured runtime event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeLogEntry {
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// Severity level
    pub level: LogLevel,
    /// Event name (e.g. `"job_memory_initialized"`)
    pub event: String,
    /// Event payload; a `duration` field feeds performance analysis and an
    /// `error` field feeds error-pattern mining
    pub data: serde_json::Value,
    /// Session the event belongs to
    #[serde(default)]
    pub session_id: Option<String>,
    /// Job the event belongs to
    #[serde(default)]
    pub job_id: Option<String>,
    /// Agent that emitted the event
    #[serde(default)]
    pub agent_type: Option<String>,
    /// Correlation id stitching related events into a trace
    pub correlation_id: String,
}

impl RuntimeLogEntry {
    /// Build an entry from the given context defaults, stamping the current
    /// time and a fresh correlation id.
    #[must_use]
    pub fn new(level: LogLevel, event: &str, data: serde_json::Value, ctx: &LogContext) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            event: event.to_string(),
            data,
            session_id: ctx.session_id.clone(),
            job_id: ctx.job_id.clone(),
            agent_type: ctx.agent_type.clone(),
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    /// Replace the generated correlation id with a caller-supplied one.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    /// The `data.duration` payload field in milliseconds, when present.
    #[must_use]
    pub fn duration_ms(&self) -> Option<f64> {
        self.data.get("duration").and_then(serde_json::Value::as_f64)
    }

    /// The `data.error` payload field rendered as a string, when present.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.data.get("error").map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Retrieval filter; unset fields match everything. Filters are applied
/// after the files are read.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// Match only these levels
    pub levels: Option<Vec<LogLevel>>,
    /// Match only these event names
    pub events: Option<Vec<String>>,
    /// Match only entries inside this range
    pub time_range: Option<TimeRange>,
    /// Require (or forbid) a `data.error` payload field
    pub has_error: Option<bool>,
}

impl LogFilter {
    /// Whether the entry passes every set criterion.
    #[must_use]
    pub fn matches(&self, entry: &RuntimeLogEntry) -> bool {
        if let Some(levels) = &self.levels {
            if !levels.contains(&entry.level) {
                return false;
            }
        }
        if let Some(events) = &self.events {
            if !events.iter().any(|e| e == &entry.event) {
                return false;
            }
        }
        if let Some(range) = &self.time_range {
            if !range.contains(entry.timestamp) {
                return false;
            }
        }
        if let Some(has_error) = self.has_error {
            if entry.data.get("error").is_some() != has_error {
                return false;
            }
        }
        true
    }
}
