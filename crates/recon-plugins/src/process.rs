//! Executable plugins discovered on disk.
//!
//! [`ProcessExecutor`] runs a discovered plugin file as a child process with
//! the target as its only argument. The protocol is deliberately small:
//!
//! - standard output carries one JSON document, the plugin's payload (empty
//!   output means `null`);
//! - every non-empty line on standard error is a diagnostic and is relayed
//!   to the invocation's [`DiagnosticSink`] as it arrives;
//! - a non-zero exit status is a failure whose detail is the last
//!   diagnostic line.
//!
//! Files without execute permission have no entry point. No timeout is
//! applied: a plugin that never exits blocks its job indefinitely.

use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStderr, Command, Stdio};
use std::sync::Arc;
use std::thread;

use serde_json::Value;
use tracing::debug;

use crate::catalogue::PluginDescriptor;
use crate::error::PluginError;
use crate::runner::PluginExecutor;
use crate::sink::DiagnosticSink;

/// Tracing target for plugin process operations.
const PROCESS_TARGET: &str = "recon_plugins::process";

/// Executes discovered plugin files as child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl PluginExecutor for ProcessExecutor {
    fn execute(
        &self,
        descriptor: &PluginDescriptor,
        target: &str,
        sink: &dyn DiagnosticSink,
    ) -> Result<Value, PluginError> {
        let name = descriptor.name();
        if !is_executable(descriptor.path()) {
            return Err(PluginError::missing_entry_point(name));
        }

        debug!(
            target: PROCESS_TARGET,
            plugin = name,
            executable = %descriptor.path().display(),
            "spawning plugin process"
        );

        let mut child = Command::new(descriptor.path())
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| PluginError::SpawnFailed {
                name: name.to_owned(),
                message: source.to_string(),
                source: Some(Arc::new(source)),
            })?;

        let (stdout, last_diagnostic) = match collect_output(name, &mut child, sink) {
            Ok(collected) => collected,
            Err(error) => {
                reap(name, &mut child);
                return Err(error);
            }
        };
        let status = child.wait().map_err(|source| io_error(name, source))?;

        if !status.success() {
            return Err(PluginError::NonZeroExit {
                name: name.to_owned(),
                status: status.code().unwrap_or(-1),
                detail: last_diagnostic.unwrap_or_default(),
            });
        }

        parse_payload(name, &stdout)
    }
}

/// Kills and waits for a child whose output could not be collected, so no
/// zombie outlives the invocation.
fn reap(name: &str, child: &mut Child) {
    if let Err(error) = child.kill() {
        debug!(target: PROCESS_TARGET, plugin = name, %error, "plugin process already exited");
    }
    if let Err(error) = child.wait() {
        debug!(target: PROCESS_TARGET, plugin = name, %error, "failed to reap plugin process");
    }
}

/// Reads stdout to completion while relaying stderr lines on a scoped thread.
fn collect_output(
    name: &str,
    child: &mut Child,
    sink: &dyn DiagnosticSink,
) -> Result<(String, Option<String>), PluginError> {
    let mut stdout = child.stdout.take().ok_or_else(|| PluginError::SpawnFailed {
        name: name.to_owned(),
        message: String::from("failed to capture stdout"),
        source: None,
    })?;
    let stderr = child.stderr.take();

    thread::scope(|scope| {
        let relay = scope.spawn(|| stderr.map_or(Ok(None), |pipe| relay_diagnostics(pipe, sink)));

        let mut output = String::new();
        let read = stdout.read_to_string(&mut output);

        let last = match relay.join() {
            Ok(result) => result.map_err(|source| io_error(name, source))?,
            Err(_) => {
                return Err(PluginError::InvalidOutput {
                    name: name.to_owned(),
                    message: String::from("diagnostic relay panicked"),
                });
            }
        };
        read.map_err(|source| io_error(name, source))?;
        Ok((output, last))
    })
}

/// Forwards each non-empty stderr line to `sink`, returning the last one.
///
/// Lines are decoded lossily: invalid UTF-8 never fails the invocation.
fn relay_diagnostics(
    pipe: ChildStderr,
    sink: &dyn DiagnosticSink,
) -> io::Result<Option<String>> {
    let mut reader = BufReader::new(pipe);
    let mut raw = Vec::new();
    let mut last = None;
    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            return Ok(last);
        }
        let text = String::from_utf8_lossy(&raw);
        let trimmed = text.trim_end();
        if trimmed.trim().is_empty() {
            continue;
        }
        sink.emit(trimmed);
        last = Some(trimmed.to_owned());
    }
}

fn parse_payload(name: &str, stdout: &str) -> Result<Value, PluginError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(trimmed).map_err(|error| PluginError::InvalidOutput {
        name: name.to_owned(),
        message: error.to_string(),
    })
}

fn io_error(name: &str, source: io::Error) -> PluginError {
    PluginError::Io {
        name: name.to_owned(),
        source: Arc::new(source),
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .is_ok_and(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|metadata| metadata.is_file())
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    use rstest::{fixture, rstest};
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::profile::Profile;
    use crate::sink::{DiscardSink, RecordingSink};

    #[fixture]
    fn plugin_dir() -> TempDir {
        TempDir::new().expect("temp dir")
    }

    fn write_script(dir: &TempDir, name: &str, body: &str, mode: u32) -> PluginDescriptor {
        let path: PathBuf = dir.path().join(format!("{name}.sh"));
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).expect("chmod script");
        PluginDescriptor::new(name, Profile::Lite, path)
    }

    #[rstest]
    fn stdout_json_is_the_payload(plugin_dir: TempDir) {
        let descriptor = write_script(
            &plugin_dir,
            "echo",
            r#"printf '{"target":"%s"}' "$1""#,
            0o755,
        );
        let value = ProcessExecutor
            .execute(&descriptor, "example.com", &DiscardSink)
            .expect("script succeeds");
        assert_eq!(value, json!({"target": "example.com"}));
    }

    #[rstest]
    fn stderr_lines_are_relayed(plugin_dir: TempDir) {
        let descriptor = write_script(
            &plugin_dir,
            "chatty",
            "echo 'first' >&2\necho '' >&2\necho 'second' >&2\necho '[]'",
            0o755,
        );
        let sink = RecordingSink::new();
        let value = ProcessExecutor
            .execute(&descriptor, "example.com", &sink)
            .expect("script succeeds");
        assert_eq!(value, json!([]));
        assert_eq!(sink.lines(), vec!["first", "second"]);
    }

    #[rstest]
    fn invalid_utf8_diagnostics_are_relayed_lossily(plugin_dir: TempDir) {
        let descriptor = write_script(
            &plugin_dir,
            "latin1",
            r#"printf 'caf\351 probing\n' >&2
echo '{"ok":true}'"#,
            0o755,
        );
        let sink = RecordingSink::new();
        let value = ProcessExecutor
            .execute(&descriptor, "example.com", &sink)
            .expect("script succeeds despite invalid utf-8 on stderr");
        assert_eq!(value, json!({"ok": true}));
        assert_eq!(sink.lines(), vec!["caf\u{fffd} probing"]);
    }

    #[cfg(target_os = "linux")]
    #[rstest]
    fn failed_collection_reaps_the_child(plugin_dir: TempDir) {
        let pid_file = plugin_dir.path().join("pid");
        let descriptor = write_script(
            &plugin_dir,
            "binary",
            &format!(
                "echo $$ > '{}'\nprintf '\\377\\376'",
                pid_file.display()
            ),
            0o755,
        );
        let error = ProcessExecutor
            .execute(&descriptor, "example.com", &DiscardSink)
            .expect_err("stdout is not utf-8");
        assert!(matches!(error, PluginError::Io { .. }), "{error:?}");

        let pid = fs::read_to_string(&pid_file).expect("pid file");
        let proc_entry = PathBuf::from(format!("/proc/{}", pid.trim()));
        assert!(
            !proc_entry.exists(),
            "plugin process {} was left unreaped",
            pid.trim()
        );
    }

    #[rstest]
    fn empty_output_is_null(plugin_dir: TempDir) {
        let descriptor = write_script(&plugin_dir, "quiet", "exit 0", 0o755);
        let value = ProcessExecutor
            .execute(&descriptor, "example.com", &DiscardSink)
            .expect("script succeeds");
        assert_eq!(value, Value::Null);
    }

    #[rstest]
    fn non_zero_exit_carries_last_diagnostic(plugin_dir: TempDir) {
        let descriptor = write_script(&plugin_dir, "broken", "echo 'timeout' >&2\nexit 3", 0o755);
        let error = ProcessExecutor
            .execute(&descriptor, "example.com", &DiscardSink)
            .expect_err("script fails");
        match error {
            PluginError::NonZeroExit { status, detail, .. } => {
                assert_eq!(status, 3);
                assert_eq!(detail, "timeout");
            }
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
    }

    #[rstest]
    fn malformed_output_is_rejected(plugin_dir: TempDir) {
        let descriptor = write_script(&plugin_dir, "garbled", "echo 'not json'", 0o755);
        let error = ProcessExecutor
            .execute(&descriptor, "example.com", &DiscardSink)
            .expect_err("output is not json");
        assert!(matches!(error, PluginError::InvalidOutput { .. }));
    }

    #[rstest]
    fn non_executable_file_has_no_entry_point(plugin_dir: TempDir) {
        let descriptor = write_script(&plugin_dir, "inert", "echo '{}'", 0o644);
        let error = ProcessExecutor
            .execute(&descriptor, "example.com", &DiscardSink)
            .expect_err("not executable");
        assert!(error.is_missing_entry_point());
    }
}
