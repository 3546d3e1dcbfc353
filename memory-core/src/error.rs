//! Error types for the job memory layer.

/// Result type alias for memory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the job memory and analytics layer
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An operation was invoked before [`initialize`](crate::manager::MemoryManager::initialize)
    /// completed successfully.
    #[error("memory layer used before initialization")]
    NotInitialized,

    /// A referenced job, entry, or time range has no data.
    #[error("not found: {0}")]
    NotFound(String),

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record failed to parse as JSON.
    #[error("corrupt record at {path}: {source}")]
    Corrupt {
        /// Path of the unparseable file.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Encode-side serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An attempt to mutate an immutable field, or an invalid identifier.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An optional subsystem was invoked while disabled by configuration.
    #[error("{0} is disabled")]
    Disabled(&'static str),

    /// Failure reported by the external knowledge store during promotion.
    #[error("knowledge store error: {0}")]
    Knowledge(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is recoverable (can retry with backoff)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Io(_) | Error::Knowledge(_) => true,
            Error::NotInitialized
            | Error::NotFound(_)
            | Error::Corrupt { .. }
            | Error::Serialization(_)
            | Error::Conflict(_)
            | Error::Disabled(_) => false,
        }
    }

    /// Build a `NotFound` error for a job id.
    #[must_use]
    pub fn job_not_found(job_id: &str) -> Self {
        Error::NotFound(format!("job memory {job_id}"))
    }

    /// Build a `NotFound` error for an entry within a job.
    #[must_use]
    pub fn entry_not_found(kind: &str, entry_id: &str, job_id: &str) -> Self {
        Error::NotFound(format!("{kind} {entry_id} in job {job_id}"))
    }
}
