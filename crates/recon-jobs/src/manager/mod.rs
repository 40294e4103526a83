//! Job submission, background execution, and queries.
//!
//! [`JobManager::submit`] validates the request, records an `initializing`
//! job, and hands the job to a dedicated worker thread before returning. The
//! worker drives the job through `running` to `completed`, isolating every
//! plugin failure so that the job always completes for a finite plugin set.
//!
//! Every submission gets its own thread and there is no admission limit. A
//! plugin that never returns keeps its job `running` indefinitely, since
//! invocations carry no deadline.

mod error;
mod retry;
mod worker;


use std::sync::Arc;
use std::thread::{self, JoinHandle};

use recon_plugins::{PluginCatalogue, PluginExecutor, PluginRuntime, Profile};
use time::OffsetDateTime;
use tracing::{error, info};

use crate::archive::ResultArchive;
use crate::job::{Job, JobDetail, JobId, JobSummary, StatusCounts};
use crate::store::JobStore;

pub use self::error::JobError;
pub use self::retry::RetryPolicy;
use self::worker::Worker;

/// Tracing target for job lifecycle events.
pub(crate) const MANAGER_TARGET: &str = "recon_jobs::manager";

/// Coordinates job submission and the workers that run them.
pub struct JobManager<E> {
    store: Arc<dyn JobStore>,
    runtime: Arc<PluginRuntime<E>>,
    catalogue: PluginCatalogue,
    archive: Option<ResultArchive>,
    retry: RetryPolicy,
}

impl<E> std::fmt::Debug for JobManager<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManager")
            .field("catalogue", &self.catalogue)
            .field("archive", &self.archive)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl<E: PluginExecutor + 'static> JobManager<E> {
    /// Creates a manager persisting to `store` and running plugins resolved
    /// from `catalogue` through `executor`.
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>, executor: E, catalogue: PluginCatalogue) -> Self {
        Self {
            store,
            runtime: Arc::new(PluginRuntime::new(executor)),
            catalogue,
            archive: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Archives every completed job's results into `archive`.
    #[must_use]
    pub fn with_archive(mut self, archive: ResultArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Overrides the retry policy applied to critical store writes.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the result archive, if one is configured.
    #[must_use]
    pub const fn archive(&self) -> Option<&ResultArchive> {
        self.archive.as_ref()
    }

    /// Submits a job and returns its id without waiting for it to run.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::InvalidInput`] for a blank target, in which case no
    /// job is created, or any error raised while recording the job or
    /// starting its worker.
    pub fn submit(&self, target: &str, profile: Profile) -> Result<JobId, JobError> {
        self.submit_tracked(target, profile)
            .map(WorkerHandle::into_job_id)
    }

    /// Submits a job and returns a handle that can wait for its worker.
    ///
    /// # Errors
    ///
    /// As for [`JobManager::submit`].
    pub fn submit_tracked(&self, target: &str, profile: Profile) -> Result<WorkerHandle, JobError> {
        let scan_target = target.trim();
        if scan_target.is_empty() {
            return Err(JobError::InvalidInput {
                message: "target must not be empty".into(),
            });
        }

        let id = JobId::generate();
        self.store.create(Job::new(
            id.clone(),
            scan_target,
            profile,
            OffsetDateTime::now_utc(),
        ))?;
        info!(
            target: MANAGER_TARGET,
            job_id = %id,
            scan_target,
            %profile,
            "job submitted"
        );

        let worker = Worker {
            id: id.clone(),
            target: scan_target.to_owned(),
            profile,
            store: Arc::clone(&self.store),
            runtime: Arc::clone(&self.runtime),
            catalogue: self.catalogue.clone(),
            archive: self.archive.clone(),
            retry: self.retry,
        };
        let thread = thread::Builder::new()
            .name(format!("recon-job-{id}"))
            .spawn(move || worker.run())
            .map_err(|source| {
                error!(target: MANAGER_TARGET, job_id = %id, %source, "failed to start worker");
                JobError::Spawn {
                    id: id.clone(),
                    source: Arc::new(source),
                }
            })?;

        Ok(WorkerHandle { job_id: id, thread })
    }

    /// Fetches the full job record.
    ///
    /// # Errors
    ///
    /// Returns a not-found [`JobError::Store`] for unknown ids.
    pub fn get(&self, id: &JobId) -> Result<Job, JobError> {
        Ok(self.store.get(id)?)
    }

    /// Lists job summaries, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Store`] when the store cannot be read.
    pub fn list(&self) -> Result<Vec<JobSummary>, JobError> {
        Ok(self.store.list_summaries()?)
    }

    /// Returns the results view of a job.
    ///
    /// # Errors
    ///
    /// Returns a not-found [`JobError::Store`] for unknown ids.
    pub fn detail(&self, id: &JobId) -> Result<JobDetail, JobError> {
        Ok(self.store.get(id)?.detail())
    }

    /// Counts jobs by status.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Store`] when the store cannot be read.
    pub fn stats(&self) -> Result<StatusCounts, JobError> {
        Ok(self.store.count_by_status()?)
    }

    /// Returns a job's log lines.
    ///
    /// # Errors
    ///
    /// Returns a not-found [`JobError::Store`] for unknown ids.
    pub fn logs(&self, id: &JobId) -> Result<Vec<String>, JobError> {
        Ok(self.store.logs(id)?)
    }
}

/// Handle to a running worker.
///
/// Dropping the handle detaches the worker; it keeps running to completion.
#[derive(Debug)]
pub struct WorkerHandle {
    job_id: JobId,
    thread: JoinHandle<Result<(), JobError>>,
}

impl WorkerHandle {
    /// Returns the id of the job the worker runs.
    #[must_use]
    pub const fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Waits for the worker to finish and returns its outcome.
    ///
    /// # Errors
    ///
    /// Returns the worker's error, or [`JobError::WorkerPanicked`] when the
    /// worker thread panicked.
    pub fn join(self) -> Result<(), JobError> {
        let Self { job_id, thread } = self;
        thread
            .join()
            .unwrap_or_else(|_| Err(JobError::WorkerPanicked { id: job_id }))
    }

    fn into_job_id(self) -> JobId {
        self.job_id
    }
}
