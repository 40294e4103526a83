//! Shared test support and daemon-level unit tests.


use std::fs;
use std::sync::{Arc, Mutex, PoisonError};

use camino::Utf8PathBuf;
use recon_config::{Config, SocketEndpoint};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use crate::bootstrap::{BootstrapError, StaticConfigLoader, bootstrap_with};
use crate::health::HealthReporter;
use crate::plugins::builtin_registry;
use crate::process::{ShutdownError, ShutdownSignal, run_daemon_with};

/// Lifecycle events observed by [`RecordingHealthReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ListenerReady(String),
    ShutdownCompleted,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub(crate) fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_ready(&self, endpoint: &SocketEndpoint) {
        self.record(HealthEvent::ListenerReady(endpoint.to_string()));
    }

    fn shutdown_completed(&self) {
        self.record(HealthEvent::ShutdownCompleted);
    }
}

/// Temporary plugin root and archive directory for a daemon under test.
///
/// The `lite` profile holds the built-in `dns` plugin and `orphan`, a file
/// with no execute permission.
pub(crate) struct DaemonFixture {
    pub(crate) root: TempDir,
}

impl DaemonFixture {
    pub(crate) fn new() -> Self {
        let root = tempfile::tempdir().expect("temp dir");
        let lite = root.path().join("plugins").join("lite");
        fs::create_dir_all(&lite).expect("create lite profile");
        fs::write(lite.join("dns"), "").expect("write dns marker");
        fs::write(lite.join("orphan"), "").expect("write orphan");
        Self { root }
    }

    fn path(&self, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.root.path().join(name)).expect("utf-8 temp path")
    }

    pub(crate) fn config(&self) -> Config {
        Config {
            daemon_socket: SocketEndpoint::tcp("127.0.0.1", 0),
            plugin_root: self.path("plugins"),
            output_dir: self.path("output"),
            ..Config::default()
        }
    }
}

#[fixture]
fn daemon_fixture() -> DaemonFixture {
    DaemonFixture::new()
}

struct ImmediateShutdown;

impl ShutdownSignal for ImmediateShutdown {
    fn wait(&self) -> Result<(), ShutdownError> {
        Ok(())
    }
}

#[rstest]
fn bootstrap_prepares_archive_directory(daemon_fixture: DaemonFixture) {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let loader = StaticConfigLoader::new(daemon_fixture.config());
    let daemon = bootstrap_with(
        &loader,
        Arc::clone(&reporter) as Arc<dyn HealthReporter>,
        builtin_registry().expect("registry"),
    )
    .expect("bootstrap");

    assert!(daemon.archive().directory().is_dir());
    assert_eq!(
        reporter.events(),
        [HealthEvent::BootstrapStarting, HealthEvent::BootstrapSucceeded]
    );
}

#[rstest]
fn bootstrap_reports_unusable_archive_directory(daemon_fixture: DaemonFixture) {
    let blocker = daemon_fixture.path("blocker");
    fs::write(&blocker, "not a directory").expect("write blocker");
    let config = Config {
        output_dir: blocker.join("output"),
        ..daemon_fixture.config()
    };
    let reporter = Arc::new(RecordingHealthReporter::default());

    let error = bootstrap_with(
        &StaticConfigLoader::new(config),
        Arc::clone(&reporter) as Arc<dyn HealthReporter>,
        builtin_registry().expect("registry"),
    )
    .expect_err("archive directory cannot be created");

    assert!(matches!(error, BootstrapError::Archive { .. }));
    let events = reporter.events();
    assert!(
        matches!(events.last(), Some(HealthEvent::BootstrapFailed(message)) if message.contains("archive")),
        "unexpected events: {events:?}"
    );
}

#[rstest]
fn daemon_runs_until_shutdown_is_requested(daemon_fixture: DaemonFixture) {
    let reporter = Arc::new(RecordingHealthReporter::default());

    run_daemon_with(
        &StaticConfigLoader::new(daemon_fixture.config()),
        Arc::clone(&reporter) as Arc<dyn HealthReporter>,
        &ImmediateShutdown,
    )
    .expect("daemon run");

    assert_eq!(
        reporter.events(),
        [
            HealthEvent::BootstrapStarting,
            HealthEvent::BootstrapSucceeded,
            HealthEvent::ListenerReady(String::from("tcp://127.0.0.1:0")),
            HealthEvent::ShutdownCompleted,
        ]
    );
}
