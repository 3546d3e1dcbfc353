//! Filesystem layout and write primitives.
//!
//! All persisted state lives under a configured base path:
//!
//! ```text
//! <base>/issues/<issue_id>/memory.json   one live job memory per issue
//! <base>/issues/<issue_id>/logs/         per-issue log files
//! <base>/logs/                           global runtime log files
//! <base>/analytics/                      analytics caches
//! <base>/archive/<job_id>.json           archived job memories
//! <base>/jobs.ndjson                     global job index
//! ```

mod atomic;

pub use atomic::{append_line, read_json, read_lines, write_json_atomic, write_string_atomic};

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Path derivation for the on-disk tree. Pure except for
/// [`ensure_directories`](StoreLayout::ensure_directories).
#[derive(Debug, Clone)]
pub struct StoreLayout {
    base: PathBuf,
}

impl StoreLayout {
    /// Create a layout rooted at `base`. No I/O happens here.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Root directory of all persisted state.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory holding one subdirectory per issue.
    #[must_use]
    pub fn issues_dir(&self) -> PathBuf {
        self.base.join("issues")
    }

    /// Directory for a single issue.
    #[must_use]
    pub fn issue_dir(&self, issue_id: &str) -> PathBuf {
        self.issues_dir().join(issue_id)
    }

    /// Live job memory file for an issue.
    #[must_use]
    pub fn memory_path(&self, issue_id: &str) -> PathBuf {
        self.issue_dir(issue_id).join("memory.json")
    }

    /// Per-issue log directory.
    #[must_use]
    pub fn issue_logs_dir(&self, issue_id: &str) -> PathBuf {
        self.issue_dir(issue_id).join("logs")
    }

    /// Global runtime log directory.
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    /// Reserved directory for analytics caches.
    #[must_use]
    pub fn analytics_dir(&self) -> PathBuf {
        self.base.join("analytics")
    }

    /// Directory of archived job memories.
    #[must_use]
    pub fn archive_dir(&self) -> PathBuf {
        self.base.join("archive")
    }

    /// Archived copy of a job memory.
    #[must_use]
    pub fn archive_path(&self, job_id: &str) -> PathBuf {
        self.archive_dir().join(format!("{job_id}.json"))
    }

    /// The global job index file.
    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.base.join("jobs.ndjson")
    }

    /// Derive the issue id embedded in a job id.
    ///
    /// Job ids have the shape `job-<issue_id>-<millis>-<rand>`, and issue ids
    /// may not contain `-`, so the second segment is always the issue id.
    /// This is a pure function so archival can locate the issue directory
    /// without reading the record.
    pub fn issue_id_from_job_id(job_id: &str) -> Result<&str> {
        let mut parts = job_id.split('-');
        match (parts.next(), parts.next()) {
            (Some("job"), Some(issue_id)) if !issue_id.is_empty() => Ok(issue_id),
            _ => Err(Error::Conflict(format!("malformed job id: {job_id}"))),
        }
    }

    /// Create every directory of the layout. Idempotent.
    pub async fn ensure_directories(&self) -> Result<()> {
        for dir in [
            self.issues_dir(),
            self.logs_dir(),
            self.analytics_dir(),
            self.archive_dir(),
        ] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }
}
