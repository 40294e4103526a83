//! Domain errors raised by plugin discovery and invocation.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint.
//!
//! The `Display` form of an invocation error is what ends up in a job's
//! results as `{"error": message}`, so plugin-authored failures render their
//! message verbatim.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising from plugin discovery, registration, and invocation.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin exposes no callable entry point.
    #[error("no process function")]
    MissingEntryPoint {
        /// Plugin name.
        name: String,
    },

    /// The plugin ran and reported a failure of its own.
    #[error("{message}")]
    Failed {
        /// Plugin name.
        name: String,
        /// Message supplied by the plugin.
        message: String,
    },

    /// The plugin process could not be spawned.
    #[error("plugin '{name}' failed to start: {message}")]
    SpawnFailed {
        /// Plugin name.
        name: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<io::Error>>,
    },

    /// The plugin process exited unsuccessfully.
    #[error("plugin '{name}' exited with status {status}: {detail}")]
    NonZeroExit {
        /// Plugin name.
        name: String,
        /// Exit status, or `-1` when the process was killed by a signal.
        status: i32,
        /// Last diagnostic line the process wrote, if any.
        detail: String,
    },

    /// The plugin produced output that is not a JSON document.
    #[error("plugin '{name}' wrote invalid output: {message}")]
    InvalidOutput {
        /// Plugin name.
        name: String,
        /// Description of the parse failure.
        message: String,
    },

    /// An I/O error occurred while communicating with the plugin process.
    #[error("I/O error communicating with plugin '{name}': {source}")]
    Io {
        /// Plugin name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A profile's discovery directory exists but could not be read.
    #[error("failed to read plugin directory '{}': {source}", path.display())]
    Discovery {
        /// Directory that was scanned.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A plugin could not be added to the registry.
    #[error("registration error: {message}")]
    Registration {
        /// Description of the rejection.
        message: String,
    },
}

impl PluginError {
    /// Creates a failure reported by the plugin itself.
    #[must_use]
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a missing entry point error.
    #[must_use]
    pub fn missing_entry_point(name: impl Into<String>) -> Self {
        Self::MissingEntryPoint { name: name.into() }
    }

    /// Returns `true` when the plugin had nothing to invoke.
    #[must_use]
    pub const fn is_missing_entry_point(&self) -> bool {
        matches!(self, Self::MissingEntryPoint { .. })
    }
}
