//! Response framing for the dispatch loop.

use std::io::Write;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::DispatchError;

/// Client-side stream a [`DaemonMessage::Stream`] is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamTarget {
    /// Standard error.
    Stderr,
}

/// Messages written back to clients, one JSON document per line.
///
/// Every response ends with exactly one [`DaemonMessage::Exit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DaemonMessage {
    /// Structured result of a successful command.
    Reply {
        /// Command-specific payload.
        data: Value,
    },
    /// Text for the client to print.
    Stream {
        /// Destination stream.
        stream: StreamTarget,
        /// Text to print.
        data: String,
    },
    /// Terminal message carrying the command's exit status.
    Exit {
        /// `0` on success.
        status: i32,
    },
}

/// Writes JSONL framed [`DaemonMessage`]s.
pub(crate) struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    pub(crate) const fn new(writer: W) -> Self {
        Self { writer }
    }

    pub(crate) fn write_message(&mut self, message: &DaemonMessage) -> Result<(), DispatchError> {
        serde_json::to_writer(&mut self.writer, message)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub(crate) fn write_reply(&mut self, payload: impl Serialize) -> Result<(), DispatchError> {
        let data = serde_json::to_value(payload)?;
        self.write_message(&DaemonMessage::Reply { data })
    }

    pub(crate) fn write_stderr(&mut self, data: impl Into<String>) -> Result<(), DispatchError> {
        self.write_message(&DaemonMessage::Stream {
            stream: StreamTarget::Stderr,
            data: data.into(),
        })
    }

    /// Writes the terminal exit message and flushes.
    pub(crate) fn write_exit(&mut self, status: i32) -> Result<(), DispatchError> {
        self.write_message(&DaemonMessage::Exit { status })?;
        self.writer.flush()?;
        Ok(())
    }

    pub(crate) fn write_error(&mut self, error: &DispatchError) -> Result<(), DispatchError> {
        self.write_stderr(format!("error: {error}\n"))?;
        self.write_exit(error.exit_status())
    }
}
