//! Errors raised by the job manager.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::job::JobId;
use crate::store::StoreError;

/// Errors raised while submitting, running, or querying jobs.
#[derive(Debug, Clone, Error)]
pub enum JobError {
    /// The submission was rejected before any job was created.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Human-readable reason.
        message: String,
    },
    /// A job store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The worker thread could not be started.
    #[error("failed to start worker for job '{id}': {source}")]
    Spawn {
        /// Job left in `initializing`.
        id: JobId,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The worker could not record that it started.
    #[error("failed to mark job '{id}' as running: {source}")]
    Start {
        /// Affected job.
        id: JobId,
        /// Last store error.
        #[source]
        source: StoreError,
    },
    /// The final results and status could not be persisted.
    #[error("failed to finalise job '{id}' after {attempts} attempts: {source}")]
    Finalise {
        /// Affected job, which remains `running`.
        id: JobId,
        /// Number of attempts made.
        attempts: u32,
        /// Last store error.
        #[source]
        source: StoreError,
    },
    /// The worker thread panicked outside plugin isolation.
    #[error("worker for job '{id}' panicked")]
    WorkerPanicked {
        /// Affected job.
        id: JobId,
    },
}

impl JobError {
    /// Returns `true` when the error reports a missing job.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(error) if error.is_not_found())
    }

    /// Returns `true` when the caller supplied bad input.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}
