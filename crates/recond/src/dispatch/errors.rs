//! Errors surfaced while parsing and dispatching requests.

use std::io;

use recon_jobs::{ArchiveError, JobError};
use thiserror::Error;

/// Errors surfaced during request parsing and dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request line was not a valid command document.
    #[error("malformed request: {message}")]
    MalformedRequest {
        /// Parser diagnostic.
        message: String,
        /// Underlying JSON error, when one exists.
        #[source]
        source: Option<serde_json::Error>,
    },
    /// The request line exceeded the size limit.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge {
        /// Bytes received so far.
        size: usize,
        /// Accepted maximum.
        max_size: usize,
    },
    /// Reading the request or writing the reply failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// A reply could not be serialised.
    #[error("failed to serialise response: {0}")]
    SerializeResponse(#[from] serde_json::Error),
    /// The job manager rejected or failed the operation.
    #[error(transparent)]
    Jobs(#[from] JobError),
    /// The result archive rejected or failed the operation.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

impl DispatchError {
    /// Returns the exit status reported to the client.
    ///
    /// Client mistakes map to `1`, unknown jobs or archive entries to `3`,
    /// and everything else to `2`.
    #[must_use]
    pub const fn exit_status(&self) -> i32 {
        match self {
            Self::MalformedRequest { .. } | Self::RequestTooLarge { .. } => 1,
            Self::Jobs(error) if error.is_invalid_input() => 1,
            Self::Jobs(error) if error.is_not_found() => 3,
            Self::Archive(ArchiveError::InvalidName { .. }) => 1,
            Self::Archive(ArchiveError::NotFound { .. }) => 3,
            Self::Io(_) | Self::SerializeResponse(_) | Self::Jobs(_) | Self::Archive(_) => 2,
        }
    }

    /// Builds a malformed request error from a JSON parser failure.
    #[must_use]
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedRequest {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Builds a malformed request error with a custom message.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a request-too-large error.
    #[must_use]
    pub const fn request_too_large(size: usize, max_size: usize) -> Self {
        Self::RequestTooLarge { size, max_size }
    }
}
