//! Background execution of a single job.

use std::sync::Arc;

use recon_plugins::{DiagnosticSink, PluginCatalogue, PluginExecutor, PluginRuntime, Profile};
use time::OffsetDateTime;
use tracing::{error, info, warn};

use super::{JobError, MANAGER_TARGET, RetryPolicy};
use crate::archive::ResultArchive;
use crate::correlator::JobLog;
use crate::job::{JobId, JobResults, JobStatus};
use crate::store::JobStore;

/// State owned by one worker thread.
pub(super) struct Worker<E> {
    pub(super) id: JobId,
    pub(super) target: String,
    pub(super) profile: Profile,
    pub(super) store: Arc<dyn JobStore>,
    pub(super) runtime: Arc<PluginRuntime<E>>,
    pub(super) catalogue: PluginCatalogue,
    pub(super) archive: Option<ResultArchive>,
    pub(super) retry: RetryPolicy,
}

impl<E: PluginExecutor> Worker<E> {
    pub(super) fn run(self) -> Result<(), JobError> {
        let result = self.execute();
        match &result {
            Ok(()) => info!(target: MANAGER_TARGET, job_id = %self.id, "job completed"),
            Err(failure) => error!(
                target: MANAGER_TARGET,
                job_id = %self.id,
                error = %failure,
                "job could not be completed"
            ),
        }
        result
    }

    fn execute(&self) -> Result<(), JobError> {
        let log = JobLog::new(self.id.clone(), Arc::clone(&self.store));
        self.start()?;
        info!(target: MANAGER_TARGET, job_id = %self.id, "job started");
        log.emit(&format!(
            "Starting {} scan for {} (ID: {})",
            self.profile, self.target, self.id
        ));

        let descriptors = self.catalogue.resolve(self.profile).unwrap_or_else(|failure| {
            log.emit(&format!("Plugin discovery failed: {failure}"));
            Vec::new()
        });
        log.emit(&format!(
            "Found {} plugins for profile {}",
            descriptors.len(),
            self.profile
        ));

        let mut results = JobResults::new();
        for descriptor in &descriptors {
            let name = descriptor.name();
            log.emit(&format!("Running {name}..."));
            let outcome = self.runtime.run(descriptor, &self.target, &log);
            if let Some(message) = outcome.failure_message() {
                log.emit(&format!("Error running plugin {name}: {message}"));
            }
            let value = outcome.into_value();
            if let Err(failure) = self.store.record_result(&self.id, name, value.clone()) {
                warn!(
                    target: MANAGER_TARGET,
                    job_id = %self.id,
                    plugin = name,
                    error = %failure,
                    "failed to record plugin result"
                );
            }
            results.insert(name.to_owned(), value);
        }

        self.finalise(results)?;
        log.emit(&format!("Scan completed for {}", self.target));
        self.archive_results(&log);
        Ok(())
    }

    fn start(&self) -> Result<(), JobError> {
        self.retry
            .run("start", || {
                self.store
                    .set_status(&self.id, JobStatus::Running, OffsetDateTime::now_utc())
            })
            .map_err(|(source, _)| JobError::Start {
                id: self.id.clone(),
                source,
            })
    }

    fn finalise(&self, results: JobResults) -> Result<(), JobError> {
        let mut results_written = false;
        self.retry
            .run("finalise", || {
                if !results_written {
                    self.store.set_results(&self.id, results.clone())?;
                    results_written = true;
                }
                self.store
                    .set_status(&self.id, JobStatus::Completed, OffsetDateTime::now_utc())
            })
            .map_err(|(source, attempts)| JobError::Finalise {
                id: self.id.clone(),
                attempts,
                source,
            })
    }

    fn archive_results(&self, log: &JobLog) {
        let Some(archive) = &self.archive else {
            return;
        };
        let saved = self
            .store
            .get(&self.id)
            .map_err(|failure| failure.to_string())
            .and_then(|job| archive.save(&job).map_err(|failure| failure.to_string()));
        match saved {
            Ok(path) => log.emit(&format!("Results saved to {path}")),
            Err(message) => {
                warn!(
                    target: MANAGER_TARGET,
                    job_id = %self.id,
                    error = %message,
                    "failed to archive results"
                );
                log.emit(&format!("Failed to save results: {message}"));
            }
        }
    }
}
