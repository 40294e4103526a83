//! Routes parsed requests to the job manager and result archive.

use std::io::Write;
use std::sync::Arc;

use recon_jobs::{JobManager, ResultArchive};
use recon_plugins::PluginExecutor;
use serde_json::json;

use super::errors::DispatchError;
use super::request::CommandRequest;
use super::response::ResponseWriter;

/// Tracing target for dispatch events.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

pub(crate) struct CommandRouter<E> {
    jobs: Arc<JobManager<E>>,
    archive: ResultArchive,
}

impl<E: PluginExecutor + 'static> CommandRouter<E> {
    pub(crate) const fn new(jobs: Arc<JobManager<E>>, archive: ResultArchive) -> Self {
        Self { jobs, archive }
    }

    /// Executes `request` and writes its reply, returning the exit status.
    pub(crate) fn route<W: Write>(
        &self,
        request: &CommandRequest,
        writer: &mut ResponseWriter<W>,
    ) -> Result<i32, DispatchError> {
        match request {
            CommandRequest::Submit { target, profile } => {
                let job_id = self.jobs.submit(target, *profile)?;
                writer.write_reply(json!({ "job_id": job_id }))?;
            }
            CommandRequest::Status { job_id } => writer.write_reply(self.jobs.get(job_id)?)?,
            CommandRequest::List => writer.write_reply(self.jobs.list()?)?,
            CommandRequest::Detail { job_id } => writer.write_reply(self.jobs.detail(job_id)?)?,
            CommandRequest::Stats => writer.write_reply(self.jobs.stats()?)?,
            CommandRequest::Logs { job_id } => writer.write_reply(self.jobs.logs(job_id)?)?,
            CommandRequest::ArchiveList => writer.write_reply(self.archive.list()?)?,
            CommandRequest::ArchiveRead { name } => writer.write_reply(self.archive.read(name)?)?,
        }
        Ok(0)
    }
}
