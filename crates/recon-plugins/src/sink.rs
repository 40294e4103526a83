//! Diagnostic output channel handed to each plugin invocation.

/// Receives diagnostic lines emitted while a plugin runs.
///
/// Implementations must never fail: a sink that cannot record a line drops
/// it rather than disturbing the invocation.
pub trait DiagnosticSink: Send + Sync {
    /// Records one diagnostic line.
    fn emit(&self, message: &str);
}

/// Sink that drops every line.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl DiagnosticSink for DiscardSink {
    fn emit(&self, _message: &str) {}
}

#[cfg(any(test, feature = "test-support"))]
pub use self::recording::RecordingSink;

#[cfg(any(test, feature = "test-support"))]
mod recording {
    use std::sync::{Mutex, PoisonError};

    use super::DiagnosticSink;

    /// Sink that keeps every line in memory for later assertions.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        lines: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        /// Creates an empty recording sink.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Returns a copy of the recorded lines in emission order.
        #[must_use]
        pub fn lines(&self) -> Vec<String> {
            self.lines
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl DiagnosticSink for RecordingSink {
        fn emit(&self, message: &str) {
            self.lines
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(message.to_owned());
        }
    }
}
