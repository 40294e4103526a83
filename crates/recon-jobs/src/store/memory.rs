//! Process-local job store.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use time::OffsetDateTime;

use super::{JobStore, StoreError};
use crate::job::{Job, JobId, JobResults, JobStatus, JobSummary, StatusCounts};

/// Job store holding every record in memory behind a read-write lock.
///
/// Records live for the lifetime of the process. A poisoned lock is recovered
/// rather than reported, since every mutation leaves the map consistent.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    inner: RwLock<Records>,
}

#[derive(Debug, Default)]
struct Records {
    jobs: HashMap<JobId, Entry>,
    next_sequence: u64,
}

#[derive(Debug)]
struct Entry {
    sequence: u64,
    job: Job,
}

impl InMemoryJobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Records> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Records> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_job<T>(
        &self,
        id: &JobId,
        update: impl FnOnce(&mut Job) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut records = self.write();
        let entry = records
            .jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
        update(&mut entry.job)
    }
}

fn ensure_unsealed(job: &Job) -> Result<(), StoreError> {
    if job.status == JobStatus::Completed {
        return Err(StoreError::Sealed { id: job.id.clone() });
    }
    Ok(())
}

impl JobStore for InMemoryJobStore {
    fn create(&self, job: Job) -> Result<(), StoreError> {
        let mut records = self.write();
        if records.jobs.contains_key(&job.id) {
            return Err(StoreError::DuplicateJob { id: job.id });
        }
        let sequence = records.next_sequence;
        records.next_sequence += 1;
        records.jobs.insert(job.id.clone(), Entry { sequence, job });
        Ok(())
    }

    fn set_status(
        &self,
        id: &JobId,
        status: JobStatus,
        at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.with_job(id, |job| {
            if job.status.successor() != Some(status) {
                return Err(StoreError::InvalidTransition {
                    id: id.clone(),
                    from: job.status,
                    to: status,
                });
            }
            match status {
                JobStatus::Initializing => {}
                JobStatus::Running => job.start_time = Some(at),
                JobStatus::Completed => job.end_time = Some(at),
            }
            job.status = status;
            Ok(())
        })
    }

    fn append_log(&self, id: &JobId, line: &str) -> Result<(), StoreError> {
        self.with_job(id, |job| {
            job.logs.push(line.to_owned());
            Ok(())
        })
    }

    fn record_result(&self, id: &JobId, plugin: &str, value: Value) -> Result<(), StoreError> {
        self.with_job(id, |job| {
            ensure_unsealed(job)?;
            job.results.insert(plugin.to_owned(), value);
            Ok(())
        })
    }

    fn set_results(&self, id: &JobId, results: JobResults) -> Result<(), StoreError> {
        self.with_job(id, |job| {
            ensure_unsealed(job)?;
            job.results = results;
            Ok(())
        })
    }

    fn get(&self, id: &JobId) -> Result<Job, StoreError> {
        self.read()
            .jobs
            .get(id)
            .map(|entry| entry.job.clone())
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })
    }

    fn list_summaries(&self) -> Result<Vec<JobSummary>, StoreError> {
        let records = self.read();
        let mut entries: Vec<&Entry> = records.jobs.values().collect();
        entries.sort_by(|a, b| {
            b.job
                .created_at
                .cmp(&a.job.created_at)
                .then_with(|| b.sequence.cmp(&a.sequence))
        });
        Ok(entries.into_iter().map(|entry| entry.job.summary()).collect())
    }

    fn count_by_status(&self) -> Result<StatusCounts, StoreError> {
        Ok(self
            .read()
            .jobs
            .values()
            .map(|entry| entry.job.status)
            .collect())
    }

    fn logs(&self, id: &JobId) -> Result<Vec<String>, StoreError> {
        self.read()
            .jobs
            .get(id)
            .map(|entry| entry.job.logs.clone())
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })
    }
}
