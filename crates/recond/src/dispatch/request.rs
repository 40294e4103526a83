//! Typed request documents.

use recon_jobs::JobId;
use recon_plugins::Profile;
use serde::Deserialize;

use super::errors::DispatchError;

/// A single client request, tagged by its `command` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum CommandRequest {
    /// Starts a scan and replies with the new job identifier.
    Submit {
        /// Host or domain to probe.
        target: String,
        /// Plugin profile; defaults to `deep`.
        #[serde(default)]
        profile: Profile,
    },
    /// Returns the full job record.
    Status {
        /// Job to inspect.
        job_id: JobId,
    },
    /// Returns every job summary, newest first.
    List,
    /// Returns results and timing for one job.
    Detail {
        /// Job to inspect.
        job_id: JobId,
    },
    /// Returns job counts by status.
    Stats,
    /// Returns the stored log lines of one job.
    Logs {
        /// Job to inspect.
        job_id: JobId,
    },
    /// Lists archived result documents, newest first.
    ArchiveList,
    /// Reads one archived result document.
    ArchiveRead {
        /// Archive file name as returned by `archive-list`.
        name: String,
    },
}

impl CommandRequest {
    /// Parses a request line, ignoring trailing whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MalformedRequest`] when the line is empty or is
    /// not a valid command document.
    pub fn parse(line: &[u8]) -> Result<Self, DispatchError> {
        let trimmed = line.trim_ascii_end();
        if trimmed.is_empty() {
            return Err(DispatchError::malformed("empty request"));
        }
        serde_json::from_slice(trimmed).map_err(DispatchError::from_json_error)
    }

    /// Returns the command name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Submit { .. } => "submit",
            Self::Status { .. } => "status",
            Self::List => "list",
            Self::Detail { .. } => "detail",
            Self::Stats => "stats",
            Self::Logs { .. } => "logs",
            Self::ArchiveList => "archive-list",
            Self::ArchiveRead { .. } => "archive-read",
        }
    }
}
