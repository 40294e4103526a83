//! Job records and the read models derived from them.

use std::collections::BTreeMap;
use std::fmt;

use recon_plugins::Profile;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use time::OffsetDateTime;
use uuid::Uuid;

/// Per-plugin results keyed by plugin name.
///
/// Each value is either the plugin's success payload or `{"error": message}`.
pub type JobResults = BTreeMap<String, Value>;

/// Opaque job identifier, unique for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Lifecycle state of a job.
///
/// Variants are ordered by lifecycle position so that `a < b` holds exactly
/// when `a` precedes `b`. Stores rely on this ordering to reject regressions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    /// Created; the worker has not started yet.
    Initializing,
    /// The worker is running plugins.
    Running,
    /// Every plugin has been processed and the results are final.
    Completed,
}

impl JobStatus {
    /// Returns the status that directly follows this one, if any.
    #[must_use]
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::Initializing => Some(Self::Running),
            Self::Running => Some(Self::Completed),
            Self::Completed => None,
        }
    }
}

/// Full job record as held by a job store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier.
    pub id: JobId,
    /// Identifier being probed, typically a domain name.
    pub target: String,
    /// Plugin set the job runs.
    pub profile: Profile,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Submission time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Time the worker started; unset while initializing.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
    /// Time the job completed; unset until then.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    /// Timestamped diagnostic lines in emission order.
    #[serde(default)]
    pub logs: Vec<String>,
    /// Outcome of each plugin that has run so far.
    #[serde(default)]
    pub results: JobResults,
}

impl Job {
    /// Creates an `initializing` record with no logs and no results.
    #[must_use]
    pub fn new(
        id: JobId,
        target: impl Into<String>,
        profile: Profile,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            target: target.into(),
            profile,
            status: JobStatus::Initializing,
            created_at,
            start_time: None,
            end_time: None,
            logs: Vec::new(),
            results: JobResults::new(),
        }
    }

    /// Returns the list-view projection of this record.
    #[must_use]
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id.clone(),
            target: self.target.clone(),
            profile: self.profile,
            status: self.status,
            created_at: self.created_at,
            end_time: self.end_time,
        }
    }

    /// Returns the results-view projection of this record.
    #[must_use]
    pub fn detail(&self) -> JobDetail {
        JobDetail {
            results: self.results.clone(),
            target: self.target.clone(),
            profile: self.profile,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// Row returned by job listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Unique identifier.
    pub id: JobId,
    /// Identifier being probed.
    pub target: String,
    /// Plugin set the job runs.
    pub profile: Profile,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Submission time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Completion time, if any.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
}

/// Results view of a single job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    /// Outcome of each plugin that has run so far.
    pub results: JobResults,
    /// Identifier being probed.
    pub target: String,
    /// Plugin set the job runs.
    pub profile: Profile,
    /// Time the worker started.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
    /// Completion time.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
}

/// Number of jobs in each lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// All jobs known to the store.
    pub total: usize,
    /// Jobs whose worker has not started.
    pub initializing: usize,
    /// Jobs whose worker is running.
    pub running: usize,
    /// Jobs that reached `completed`.
    pub completed: usize,
}

impl StatusCounts {
    /// Counts one more job in `status`.
    pub const fn record(&mut self, status: JobStatus) {
        self.total += 1;
        match status {
            JobStatus::Initializing => self.initializing += 1,
            JobStatus::Running => self.running += 1,
            JobStatus::Completed => self.completed += 1,
        }
    }
}

impl FromIterator<JobStatus> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = JobStatus>>(iter: I) -> Self {
        let mut counts = Self::default();
        for status in iter {
            counts.record(status);
        }
        counts
    }
}
