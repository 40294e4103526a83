//! Daemon bootstrap orchestration.

use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use recon_config::{Config, SocketPreparationError};
use recon_jobs::{ArchiveError, InMemoryJobStore, JobManager, ResultArchive};
use recon_plugins::{FallbackExecutor, PluginCatalogue, PluginRegistry, ProcessExecutor};

use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Executor used by the daemon: built-in plugins first, then plugin files
/// executed as standalone programs.
pub type DaemonExecutor = FallbackExecutor<PluginRegistry, ProcessExecutor>;

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader error when any configuration layer is invalid.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader reading the process arguments, environment, and configuration files.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::from_process()
    }
}

/// Loader returning a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
    /// The result archive directory could not be created.
    #[error("failed to prepare result archive: {source}")]
    Archive {
        /// Underlying archive error.
        #[source]
        source: ArchiveError,
    },
}

/// Fully wired daemon services.
pub struct Daemon {
    config: Config,
    telemetry: TelemetryHandle,
    jobs: Arc<JobManager<DaemonExecutor>>,
    archive: ResultArchive,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Returns the job manager shared with request handlers.
    #[must_use]
    pub fn jobs(&self) -> Arc<JobManager<DaemonExecutor>> {
        Arc::clone(&self.jobs)
    }

    /// Returns the result archive.
    #[must_use]
    pub const fn archive(&self) -> &ResultArchive {
        &self.archive
    }

    /// Returns the health reporter the daemon was bootstrapped with.
    #[must_use]
    pub fn reporter(&self) -> Arc<dyn HealthReporter> {
        Arc::clone(&self.reporter)
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("config", &self.config)
            .field("archive", &self.archive)
            .finish_non_exhaustive()
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// `registry` holds the built-in plugins; discovered plugin files without a
/// built-in implementation are run as executables.
///
/// # Errors
///
/// Returns a [`BootstrapError`] naming the first stage that failed. The failure
/// is also reported through `reporter`.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    registry: PluginRegistry,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    let fail = |error: BootstrapError| {
        reporter.bootstrap_failed(&error);
        error
    };

    let config = loader
        .load()
        .map_err(|source| fail(BootstrapError::Configuration { source }))?;
    let telemetry = telemetry::initialise(&config)
        .map_err(|source| fail(BootstrapError::Telemetry { source }))?;
    config
        .daemon_socket()
        .prepare_filesystem()
        .map_err(|source| fail(BootstrapError::Socket { source }))?;
    let archive = ResultArchive::new(config.output_dir());
    archive
        .prepare()
        .map_err(|source| fail(BootstrapError::Archive { source }))?;

    let executor = FallbackExecutor::new(registry, ProcessExecutor);
    let catalogue = PluginCatalogue::new(config.plugin_root().as_std_path());
    let jobs = JobManager::new(Arc::new(InMemoryJobStore::new()), executor, catalogue)
        .with_archive(archive.clone());
    reporter.bootstrap_succeeded(&config);

    Ok(Daemon {
        config,
        telemetry,
        jobs: Arc::new(jobs),
        archive,
        reporter,
    })
}
