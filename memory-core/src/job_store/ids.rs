//! Job and entry id generation.
//!
//! Job ids embed the issue id so the issue directory can be recovered from
//! the id alone: `job-<issue_id>-<millis>-<rand6>`. Entry ids follow
//! `<kind>-<millis>-<rand9>`.

use chrono::Utc;
use rand::RngExt;

const SUFFIX_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a job id for an issue. The suffix is random, not monotonic;
/// callers re-roll on the unlikely collision.
#[must_use]
pub(crate) fn generate_job_id(issue_id: &str) -> String {
    format!(
        "job-{issue_id}-{}-{}",
        Utc::now().timestamp_millis(),
        random_suffix(6)
    )
}

/// Generate an id for an entry of the given kind
/// (`decision`, `gotcha`, `context`, `outcome`).
#[must_use]
pub(crate) fn generate_entry_id(kind: &str) -> String {
    format!("{kind}-{}-{}", Utc::now().timestamp_millis(), random_suffix(9))
}

fn random_suffix(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..SUFFIX_CHARS.len());
            SUFFIX_CHARS[idx] as char
        })
        .collect()
}
