//! Errors surfaced while launching or supervising the daemon.

use recon_plugins::PluginError;
use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::transport::ListenerError;

use super::shutdown::ShutdownError;

/// Errors that stop the daemon from starting or shutting down cleanly.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The built-in plugin registry could not be assembled.
    #[error("failed to register built-in plugins: {0}")]
    Plugins(#[from] PluginError),
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The socket listener failed to bind, start, or stop.
    #[error("socket listener failed: {0}")]
    Listener(#[from] ListenerError),
    /// Waiting for a termination signal failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}
