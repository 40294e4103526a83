//! Job lifecycle engine for recon scans.
//!
//! A job runs every plugin of one [`Profile`](recon_plugins::Profile) against
//! a single target. [`JobManager`] records the job, runs it on a dedicated
//! worker, and moves it through `initializing`, `running`, and `completed`.
//! State lives behind the [`JobStore`] trait; [`InMemoryJobStore`] is the
//! bundled backend.
//!
//! Each worker owns a [`JobLog`] bound to its job id and passes it to every
//! plugin invocation, so diagnostic lines always land in the log of the job
//! that produced them. Completed jobs may additionally be written to a
//! [`ResultArchive`].

pub mod archive;
pub mod correlator;
pub mod job;
pub mod manager;
pub mod store;

#[cfg(test)]
mod tests;

pub use self::archive::{ArchiveError, ResultArchive};
pub use self::correlator::{JobLog, strip_control_sequences};
pub use self::job::{Job, JobDetail, JobId, JobResults, JobStatus, JobSummary, StatusCounts};
pub use self::manager::{JobError, JobManager, RetryPolicy, WorkerHandle};
pub use self::store::{InMemoryJobStore, JobStore, StoreError};
