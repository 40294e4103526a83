use camino::Utf8PathBuf;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// TCP port used where Unix domain sockets are unavailable.
pub const DEFAULT_TCP_PORT: u16 = 9780;

/// Log filter applied when nothing else is configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Directory holding one plugin discovery directory per profile.
pub const DEFAULT_PLUGIN_ROOT: &str = "plugins";

/// Directory receiving archived job results.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Returns the default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned form of [`default_log_filter`] for serde and the config derive.
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Returns the default log format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Returns the default plugin root directory.
#[must_use]
pub fn default_plugin_root() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_PLUGIN_ROOT)
}

/// Returns the default result archive directory.
#[must_use]
pub fn default_output_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_OUTPUT_DIR)
}

/// Computes the default socket endpoint for the daemon.
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    default_socket_endpoint_inner()
}

#[cfg(unix)]
fn default_socket_endpoint_inner() -> SocketEndpoint {
    let mut base = match runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok()) {
        Some(dir) => {
            let mut base = dir;
            base.push("recon");
            base
        }
        None => {
            let mut base = Utf8PathBuf::from_path_buf(std::env::temp_dir())
                .unwrap_or_else(|_| Utf8PathBuf::from("/tmp"));
            base.push("recon");
            base.push(user_namespace());
            base
        }
    };
    base.push("recond.sock");
    SocketEndpoint::unix(base)
}

#[cfg(unix)]
fn user_namespace() -> String {
    // SAFETY: `geteuid` has no preconditions and cannot fail.
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn default_socket_endpoint_inner() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}
