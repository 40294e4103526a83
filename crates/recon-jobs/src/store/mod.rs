//! Persistence seam for job records.
//!
//! The job engine never caches job state beyond one worker's execution; every
//! read and write goes through a [`JobStore`]. [`InMemoryJobStore`] is the
//! bundled backend. Other backends implement the same trait and must uphold the
//! same invariants:
//!
//! - job ids are unique ([`StoreError::DuplicateJob`]);
//! - status only ever advances to its direct successor
//!   ([`StoreError::InvalidTransition`]);
//! - results are fixed once a job completes ([`StoreError::Sealed`]);
//! - `append_log` is atomic with respect to the stored log sequence.

mod memory;


use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use crate::job::{Job, JobId, JobResults, JobStatus, JobSummary, StatusCounts};

pub use self::memory::InMemoryJobStore;

/// Errors reported by job stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No job exists with the given identifier.
    #[error("job '{id}' not found")]
    NotFound {
        /// Identifier that was looked up.
        id: JobId,
    },
    /// A job with the same identifier already exists.
    #[error("job '{id}' already exists")]
    DuplicateJob {
        /// Conflicting identifier.
        id: JobId,
    },
    /// The requested status is not the direct successor of the current one.
    #[error("job '{id}' cannot move from {from} to {to}")]
    InvalidTransition {
        /// Job being updated.
        id: JobId,
        /// Current status.
        from: JobStatus,
        /// Requested status.
        to: JobStatus,
    },
    /// The job has completed and its results can no longer change.
    #[error("job '{id}' is completed and its results are sealed")]
    Sealed {
        /// Job being updated.
        id: JobId,
    },
    /// The backend could not be reached.
    #[error("job store unavailable: {message}")]
    Unavailable {
        /// Backend-specific description.
        message: String,
    },
}

impl StoreError {
    /// Returns `true` when the error reports a missing job.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` when repeating the operation may succeed.
    ///
    /// Only an unreachable backend is transient; every other variant reports
    /// a fact about the job that a retry cannot change.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Durable record of job metadata, logs, and results.
///
/// Implementations must support concurrent calls from many workers. Each job
/// has a single writer (its worker), but `append_log` must still never lose
/// updates when called concurrently for the same job.
pub trait JobStore: Send + Sync {
    /// Inserts a new job record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateJob`] when the id is already taken.
    fn create(&self, job: Job) -> Result<(), StoreError>;

    /// Moves a job forward to `status`, stamping `at` into the timestamp field
    /// the status implies (`running` sets `start_time`, `completed` sets
    /// `end_time`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTransition`] unless `status` directly
    /// follows the current status.
    fn set_status(&self, id: &JobId, status: JobStatus, at: OffsetDateTime)
    -> Result<(), StoreError>;

    /// Appends one line to the job's log sequence.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown jobs.
    fn append_log(&self, id: &JobId, line: &str) -> Result<(), StoreError>;

    /// Records the outcome of a single plugin.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sealed`] once the job has completed.
    fn record_result(&self, id: &JobId, plugin: &str, value: Value) -> Result<(), StoreError>;

    /// Replaces the job's results with the final set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sealed`] once the job has completed.
    fn set_results(&self, id: &JobId, results: JobResults) -> Result<(), StoreError>;

    /// Fetches a full job record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown jobs.
    fn get(&self, id: &JobId) -> Result<Job, StoreError>;

    /// Lists every job, newest `created_at` first. Jobs created at the same
    /// instant are ordered newest submission first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the backend cannot be read.
    fn list_summaries(&self) -> Result<Vec<JobSummary>, StoreError>;

    /// Counts jobs by status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the backend cannot be read.
    fn count_by_status(&self) -> Result<StatusCounts, StoreError>;

    /// Returns a copy of the job's log lines.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown jobs.
    fn logs(&self, id: &JobId) -> Result<Vec<String>, StoreError>;
}
