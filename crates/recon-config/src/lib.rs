//! Layered configuration for the recon daemon.
//!
//! Values are merged by `ortho_config` in increasing precedence: built-in
//! defaults, a TOML file named by `--config-path` or `RECON_CONFIG_PATH`,
//! `RECON_*` environment variables, and finally command-line flags.

mod defaults;
mod logging;
mod socket;

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoError;
use serde::{Deserialize, Serialize};

pub use self::defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_OUTPUT_DIR, DEFAULT_PLUGIN_ROOT, DEFAULT_TCP_PORT,
    default_log_filter, default_log_filter_string, default_log_format, default_output_dir,
    default_plugin_root, default_socket_endpoint,
};
pub use self::logging::{LogFormat, LogFormatParseError};
pub use self::socket::{SocketEndpoint, SocketParseError, SocketPreparationError};
pub use ortho_config::OrthoConfig;

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "RECON")]
pub struct Config {
    /// Socket endpoint the daemon binds for client requests.
    #[serde(default = "default_socket_endpoint")]
    #[ortho_config(default = default_socket_endpoint())]
    pub daemon_socket: SocketEndpoint,
    /// `tracing` filter expression for the operator log.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Rendering of the operator log.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Directory containing the `lite` and `deep` plugin directories.
    #[serde(default = "default_plugin_root")]
    #[ortho_config(default = default_plugin_root())]
    pub plugin_root: Utf8PathBuf,
    /// Directory receiving archived job results.
    #[serde(default = "default_output_dir")]
    #[ortho_config(default = default_output_dir())]
    pub output_dir: Utf8PathBuf,
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when any layer fails to parse.
    pub fn from_process() -> Result<Self, Arc<OrthoError>> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Returns the daemon socket endpoint.
    #[must_use]
    pub const fn daemon_socket(&self) -> &SocketEndpoint {
        &self.daemon_socket
    }

    /// Returns the log filter expression.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the plugin root directory.
    #[must_use]
    pub fn plugin_root(&self) -> &Utf8Path {
        self.plugin_root.as_path()
    }

    /// Returns the result archive directory.
    #[must_use]
    pub fn output_dir(&self) -> &Utf8Path {
        self.output_dir.as_path()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            plugin_root: default_plugin_root(),
            output_dir: default_output_dir(),
        }
    }
}
