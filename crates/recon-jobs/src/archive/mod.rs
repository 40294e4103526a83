//! On-disk archive of completed job results.
//!
//! Each completed job is written to `<output_dir>/<target>_<profile>.json`.
//! A later job against the same target and profile overwrites the earlier
//! document. Archive failures are reported to the caller but never change a
//! job's recorded outcome.


use std::fs;
use std::io;
use std::sync::Arc;
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use recon_plugins::Profile;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use crate::job::{Job, JobId, JobResults, JobStatus};

const ARCHIVE_EXTENSION: &str = "json";

/// Errors raised while reading or writing archived results.
#[derive(Debug, Clone, Error)]
pub enum ArchiveError {
    /// The archive directory could not be created.
    #[error("failed to create archive directory {path}: {source}")]
    CreateDirectory {
        /// Directory being created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// A result document could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Document path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The archive directory or a document could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path being read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// A document could not be encoded or decoded as JSON.
    #[error("invalid result document {path}: {source}")]
    Json {
        /// Document path.
        path: Utf8PathBuf,
        /// Underlying serialisation error.
        #[source]
        source: Arc<serde_json::Error>,
    },
    /// The requested name is not a plain file name.
    #[error("invalid result name '{name}'")]
    InvalidName {
        /// Rejected name.
        name: String,
    },
    /// No document exists with the requested name.
    #[error("result '{name}' not found")]
    NotFound {
        /// Requested name.
        name: String,
    },
}

#[derive(Serialize)]
struct ArchivedResult<'a> {
    target: &'a str,
    profile: Profile,
    job_id: &'a JobId,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    status: JobStatus,
    results: &'a JobResults,
}

/// Directory of archived result documents.
#[derive(Debug, Clone)]
pub struct ResultArchive {
    directory: Utf8PathBuf,
}

impl ResultArchive {
    /// Creates an archive rooted at `directory`. Nothing is touched on disk.
    #[must_use]
    pub fn new(directory: impl Into<Utf8PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Returns the archive directory.
    #[must_use]
    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    /// Creates the archive directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::CreateDirectory`] when the directory cannot be
    /// created.
    pub fn prepare(&self) -> Result<(), ArchiveError> {
        fs::create_dir_all(&self.directory).map_err(|source| ArchiveError::CreateDirectory {
            path: self.directory.clone(),
            source: Arc::new(source),
        })
    }

    /// Returns the file name used for `target` under `profile`.
    #[must_use]
    pub fn file_name(target: &str, profile: Profile) -> String {
        let safe_target = target.replace(['/', '\\'], "_");
        format!("{safe_target}_{profile}.{ARCHIVE_EXTENSION}")
    }

    /// Writes `job` as a pretty-printed document and returns its path.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Json`] or [`ArchiveError::Write`] when the
    /// document cannot be produced.
    pub fn save(&self, job: &Job) -> Result<Utf8PathBuf, ArchiveError> {
        let path = self
            .directory
            .join(Self::file_name(&job.target, job.profile));
        let document = ArchivedResult {
            target: &job.target,
            profile: job.profile,
            job_id: &job.id,
            timestamp: job.end_time.unwrap_or_else(OffsetDateTime::now_utc),
            status: job.status,
            results: &job.results,
        };
        let encoded =
            serde_json::to_vec_pretty(&document).map_err(|source| ArchiveError::Json {
                path: path.clone(),
                source: Arc::new(source),
            })?;
        fs::write(&path, encoded).map_err(|source| ArchiveError::Write {
            path: path.clone(),
            source: Arc::new(source),
        })?;
        Ok(path)
    }

    /// Lists archived document names, most recently modified first.
    ///
    /// A missing archive directory lists as empty.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Read`] when the directory cannot be read.
    pub fn list(&self) -> Result<Vec<String>, ArchiveError> {
        let read_error = |source: io::Error| ArchiveError::Read {
            path: self.directory.clone(),
            source: Arc::new(source),
        };
        let entries = match self.directory.read_dir_utf8() {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(read_error(error)),
        };

        let mut documents: Vec<(SystemTime, String)> = Vec::new();
        for item in entries {
            let entry = item.map_err(read_error)?;
            if entry.path().extension() != Some(ARCHIVE_EXTENSION) {
                continue;
            }
            let metadata = entry.metadata().map_err(read_error)?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            documents.push((modified, entry.file_name().to_owned()));
        }
        documents.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        Ok(documents.into_iter().map(|(_, name)| name).collect())
    }

    /// Reads and parses the document called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidName`] for names that are not plain file
    /// names, [`ArchiveError::NotFound`] when no such document exists, and
    /// [`ArchiveError::Read`] or [`ArchiveError::Json`] for unreadable
    /// documents.
    pub fn read(&self, name: &str) -> Result<Value, ArchiveError> {
        if !is_plain_file_name(name) {
            return Err(ArchiveError::InvalidName {
                name: name.to_owned(),
            });
        }
        let path = self.directory.join(name);
        let bytes = fs::read(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ArchiveError::NotFound {
                    name: name.to_owned(),
                }
            } else {
                ArchiveError::Read {
                    path: path.clone(),
                    source: Arc::new(source),
                }
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ArchiveError::Json {
            path,
            source: Arc::new(source),
        })
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && !matches!(name, "." | "..")
        && Utf8Path::new(name).file_name() == Some(name)
}
