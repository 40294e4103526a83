//! Runs the daemon from bootstrap to shutdown.

use std::sync::Arc;

use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::dispatch::DispatchConnectionHandler;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::plugins::builtin_registry;
use crate::transport::SocketListener;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Runs the daemon in the foreground until a termination signal arrives.
///
/// Running jobs are not cancelled; their workers stop with the process.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap fails, the socket cannot be bound,
/// or the listener cannot be stopped cleanly.
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        &SystemShutdownSignal,
    )
}

pub(crate) fn run_daemon_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    let registry = builtin_registry()?;
    let daemon = bootstrap_with(loader, reporter, registry)?;
    let endpoint = daemon.config().daemon_socket();

    let listener = SocketListener::bind(endpoint)?;
    let handler = Arc::new(DispatchConnectionHandler::new(
        daemon.jobs(),
        daemon.archive().clone(),
    ));
    let listener_handle = listener.start(handler)?;
    daemon.reporter().listener_ready(endpoint);

    // The listener stops even when waiting for the signal failed.
    let waited = shutdown.wait();
    listener_handle.shutdown();
    listener_handle.join()?;
    waited?;

    daemon.reporter().shutdown_completed();
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
