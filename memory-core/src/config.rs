//! Configuration for the job memory layer.

use std::path::PathBuf;

/// Advisory timing thresholds for the performance warnings emitted by the
/// façade. Exceeding a threshold never fails the operation.
///
/// # Examples
///
/// ```
/// use job_memory_core::config::PerformanceThresholds;
///
/// let thresholds = PerformanceThresholds {
///     memory_operation_time_ms: 100,
///     log_write_time_ms: 50,
///     analytics_calculation_time_ms: 5_000,
/// };
/// ```
#[derive(Debug, Clone)]
pub struct PerformanceThresholds {
    /// Warning threshold for job-memory-store operations
    pub memory_operation_time_ms: u64,
    /// Warning threshold for runtime-log writes
    pub log_write_time_ms: u64,
    /// Warning threshold for analytics calculations
    pub analytics_calculation_time_ms: u64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            memory_operation_time_ms: 100,
            log_write_time_ms: 50,
            analytics_calculation_time_ms: 5_000,
        }
    }
}

/// Buffering, rotation, and retention settings for the runtime log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Number of buffered entries that triggers a flush
    pub buffer_size: usize,
    /// Interval in milliseconds between timed buffer flushes
    pub flush_interval_ms: u64,
    /// Active log file is rotated once it exceeds this size in bytes
    pub max_file_size_bytes: u64,
    /// Active log file is rotated once it is older than this many hours
    pub max_file_age_hours: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            buffer_size: 100,
            flush_interval_ms: 5_000,
            max_file_size_bytes: 10 * 1024 * 1024,
            max_file_age_hours: 24,
        }
    }
}

/// Main configuration for the job memory layer.
///
/// # Examples
///
/// ```
/// use job_memory_core::config::MemoryConfig;
///
/// let config = MemoryConfig {
///     storage_base_path: "/var/lib/agents/memory".into(),
///     retention_days: 14,
///     ..MemoryConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct MemoryConfig {
    /// Root directory for all persisted state
    pub storage_base_path: PathBuf,
    /// Job memories whose `end_time` is older than this are archived during cleanup
    pub retention_days: u32,
    /// Rotated runtime-log files older than this are deleted
    pub log_retention_days: u32,
    /// Soft limit on entries per job; crossing it emits a warning
    pub max_job_memory_size: usize,
    /// Gates archival truncation and `compress_old_memories`
    pub compression_enabled: bool,
    /// If false, the façade skips post-completion analytics
    pub analytics_enabled: bool,
    /// If false, promotion is skipped even when a knowledge store is attached
    pub auto_promote_gotchas: bool,
    /// Advisory performance warning thresholds
    pub performance_thresholds: PerformanceThresholds,
    /// Runtime-log buffering and rotation settings
    pub log: LogConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            storage_base_path: PathBuf::from("./data/memory"),
            retention_days: 30,
            log_retention_days: 7,
            max_job_memory_size: 1_000,
            compression_enabled: true,
            analytics_enabled: true,
            auto_promote_gotchas: true,
            performance_thresholds: PerformanceThresholds::default(),
            log: LogConfig::default(),
        }
    }
}

impl MemoryConfig {
    /// Create a configuration rooted at the given base path, keeping every
    /// other option at its default.
    #[must_use]
    pub fn with_base_path(base: impl Into<PathBuf>) -> Self {
        Self {
            storage_base_path: base.into(),
            ..Self::default()
        }
    }
}
