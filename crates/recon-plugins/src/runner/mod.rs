//! Fault-isolated plugin invocation.
//!
//! [`PluginExecutor`] is the seam between the job engine and whatever actually
//! runs a plugin. [`PluginRuntime`] wraps an executor and guarantees that an
//! invocation always yields an [`Outcome`]: executor errors become
//! [`Outcome::Failure`] carrying the error's message, and panics are caught
//! and converted the same way.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;

use crate::catalogue::PluginDescriptor;
use crate::error::PluginError;
use crate::sink::DiagnosticSink;

/// Tracing target for plugin invocations.
const RUNNER_TARGET: &str = "recon_plugins::runner";

/// Performs a single plugin invocation.
///
/// Implementations may fail in any way they like; the runtime isolates the
/// failure.
pub trait PluginExecutor: Send + Sync {
    /// Invokes the plugin described by `descriptor` against `target`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::MissingEntryPoint`] when the executor has no way
    /// to run the plugin, or any error raised while running it.
    fn execute(
        &self,
        descriptor: &PluginDescriptor,
        target: &str,
        sink: &dyn DiagnosticSink,
    ) -> Result<Value, PluginError>;
}

impl<T: PluginExecutor + ?Sized> PluginExecutor for Arc<T> {
    fn execute(
        &self,
        descriptor: &PluginDescriptor,
        target: &str,
        sink: &dyn DiagnosticSink,
    ) -> Result<Value, PluginError> {
        (**self).execute(descriptor, target, sink)
    }
}

impl<T: PluginExecutor + ?Sized> PluginExecutor for Box<T> {
    fn execute(
        &self,
        descriptor: &PluginDescriptor,
        target: &str,
        sink: &dyn DiagnosticSink,
    ) -> Result<Value, PluginError> {
        (**self).execute(descriptor, target, sink)
    }
}

/// Executor that consults `primary` first and `fallback` only when the
/// primary has no entry point for the plugin.
#[derive(Debug, Clone)]
pub struct FallbackExecutor<A, B> {
    primary: A,
    fallback: B,
}

impl<A, B> FallbackExecutor<A, B> {
    /// Chains two executors.
    #[must_use]
    pub const fn new(primary: A, fallback: B) -> Self {
        Self { primary, fallback }
    }
}

impl<A: PluginExecutor, B: PluginExecutor> PluginExecutor for FallbackExecutor<A, B> {
    fn execute(
        &self,
        descriptor: &PluginDescriptor,
        target: &str,
        sink: &dyn DiagnosticSink,
    ) -> Result<Value, PluginError> {
        match self.primary.execute(descriptor, target, sink) {
            Err(error) if error.is_missing_entry_point() => {
                self.fallback.execute(descriptor, target, sink)
            }
            other => other,
        }
    }
}

/// Result of one isolated plugin invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The plugin returned a payload.
    Success(Value),
    /// The plugin failed; the message describes why.
    Failure(String),
}

impl Outcome {
    /// Returns `true` for [`Outcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the failure message, if any.
    #[must_use]
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(message) => Some(message.as_str()),
        }
    }

    /// Converts the outcome into the value stored in a job's results:
    /// the payload itself, or `{"error": message}`.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Success(value) => value,
            Self::Failure(message) => json!({ "error": message }),
        }
    }
}

/// Runs plugins through an executor without letting failures escape.
///
/// # Example
///
/// ```
/// use recon_plugins::{DiscardSink, Outcome, PluginDescriptor, PluginRegistry, PluginRuntime, Profile};
///
/// let runtime = PluginRuntime::new(PluginRegistry::new());
/// let descriptor = PluginDescriptor::new("absent", Profile::Deep, "plugins/deep/absent.py");
/// let outcome = runtime.run(&descriptor, "example.com", &DiscardSink);
/// assert_eq!(outcome, Outcome::Failure("no process function".into()));
/// ```
#[derive(Debug, Clone)]
pub struct PluginRuntime<E> {
    executor: E,
}

impl<E> PluginRuntime<E> {
    /// Creates a runtime around `executor`.
    #[must_use]
    pub const fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Returns the wrapped executor.
    #[must_use]
    pub const fn executor(&self) -> &E {
        &self.executor
    }
}

impl<E: PluginExecutor> PluginRuntime<E> {
    /// Invokes one plugin and captures its outcome.
    ///
    /// This method never fails and never unwinds, whatever the plugin does.
    pub fn run(
        &self,
        descriptor: &PluginDescriptor,
        target: &str,
        sink: &dyn DiagnosticSink,
    ) -> Outcome {
        let invocation = panic::catch_unwind(AssertUnwindSafe(|| {
            self.executor.execute(descriptor, target, sink)
        }));
        match invocation {
            Ok(Ok(value)) => Outcome::Success(value),
            Ok(Err(error)) => {
                debug!(
                    target: RUNNER_TARGET,
                    plugin = descriptor.name(),
                    error = %error,
                    "plugin failed"
                );
                Outcome::Failure(error.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                debug!(
                    target: RUNNER_TARGET,
                    plugin = descriptor.name(),
                    %message,
                    "plugin panicked"
                );
                Outcome::Failure(message)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("plugin panicked")
    }
}
