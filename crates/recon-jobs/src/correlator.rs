//! Per-job diagnostic log handle.
//!
//! Every worker owns exactly one [`JobLog`] bound to its job id and hands it to
//! each plugin invocation as the [`DiagnosticSink`]. Attribution therefore
//! follows ownership: a line can only reach the log of the job whose worker
//! emitted it, however many workers run at once.

use std::borrow::Cow;
use std::sync::Arc;

use once_cell::sync::Lazy;
use recon_plugins::DiagnosticSink;
use regex::Regex;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{info, warn};

use crate::job::JobId;
use crate::store::JobStore;

/// Tracing target for lines forwarded from job logs.
const JOB_LOG_TARGET: &str = "recon_jobs::job";

static CONTROL_SEQUENCES: Lazy<Regex> = Lazy::new(control_sequence_pattern);

#[expect(
    clippy::expect_used,
    reason = "the pattern is a literal and is exercised by unit tests"
)]
fn control_sequence_pattern() -> Regex {
    // CSI sequences, OSC sequences terminated by BEL or ST, and lone escapes.
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]")
        .expect("control sequence pattern is valid")
}

/// Removes terminal control sequences from `message`.
#[must_use]
pub fn strip_control_sequences(message: &str) -> Cow<'_, str> {
    CONTROL_SEQUENCES.replace_all(message, "")
}

/// Formats `at` as the `[HH:MM:SS] ` prefix used for job log lines.
fn stamp(at: OffsetDateTime) -> String {
    match at.format(format_description!("[hour]:[minute]:[second]")) {
        Ok(clock) => format!("[{clock}] "),
        Err(_) => String::new(),
    }
}

/// Diagnostic sink that appends lines to one job's log sequence.
#[derive(Clone)]
pub struct JobLog {
    job_id: JobId,
    store: Arc<dyn JobStore>,
}

impl JobLog {
    /// Binds a log handle to `job_id`.
    #[must_use]
    pub fn new(job_id: JobId, store: Arc<dyn JobStore>) -> Self {
        Self { job_id, store }
    }

    /// Returns the job this handle writes to.
    #[must_use]
    pub const fn job_id(&self) -> &JobId {
        &self.job_id
    }

    fn emit_at(&self, message: &str, at: OffsetDateTime) {
        info!(target: JOB_LOG_TARGET, job_id = %self.job_id, "{message}");

        let cleaned = strip_control_sequences(message);
        let trimmed = cleaned.trim();
        if trimmed.is_empty() {
            return;
        }

        let line = format!("{}{trimmed}", stamp(at));
        if let Err(error) = self.store.append_log(&self.job_id, &line) {
            warn!(
                target: JOB_LOG_TARGET,
                job_id = %self.job_id,
                %error,
                "dropping job log line"
            );
        }
    }
}

impl std::fmt::Debug for JobLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobLog")
            .field("job_id", &self.job_id)
            .finish_non_exhaustive()
    }
}

impl DiagnosticSink for JobLog {
    fn emit(&self, message: &str) {
        self.emit_at(message, OffsetDateTime::now_utc());
    }
}
