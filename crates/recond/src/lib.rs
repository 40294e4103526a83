//! Daemon exposing the recon job engine over a local socket.
//!
//! `recond` loads its configuration through [`recon_config`], initialises
//! structured telemetry, prepares the socket and archive directories, and then
//! serves JSONL requests until a termination signal arrives. Each connection
//! carries one request (submit a scan, inspect jobs, or read archived results)
//! and receives a reply followed by a terminal exit message.
//!
//! Jobs keep running on their own workers when the daemon shuts down the
//! listener; the process exits once the shutdown sequence completes.

mod bootstrap;
mod dispatch;
mod health;
mod plugins;
mod process;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, DaemonExecutor, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use dispatch::{CommandRequest, DaemonMessage, DispatchError, StreamTarget};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use plugins::{DnsResolver, builtin_registry};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
