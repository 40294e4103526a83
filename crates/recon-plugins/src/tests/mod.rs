//! Crate-level test doubles and behaviour tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};

use crate::catalogue::PluginDescriptor;
use crate::error::PluginError;
use crate::registry::{Plugin, PluginRegistry};
use crate::runner::{Outcome, PluginExecutor, PluginRuntime};
use crate::profile::Profile;
use crate::sink::{DiagnosticSink, RecordingSink};


/// Executor delegating to a closure.
pub(crate) struct FnExecutor<F> {
    call: F,
}

impl<F> FnExecutor<F>
where
    F: Fn(&PluginDescriptor, &str) -> Result<Value, PluginError> + Send + Sync,
{
    pub(crate) const fn new(call: F) -> Self {
        Self { call }
    }
}

impl<F> PluginExecutor for FnExecutor<F>
where
    F: Fn(&PluginDescriptor, &str) -> Result<Value, PluginError> + Send + Sync,
{
    fn execute(
        &self,
        descriptor: &PluginDescriptor,
        target: &str,
        _sink: &dyn DiagnosticSink,
    ) -> Result<Value, PluginError> {
        (self.call)(descriptor, target)
    }
}

/// Executor that counts its invocations.
pub(crate) struct CountingExecutor<F> {
    inner: FnExecutor<F>,
    calls: AtomicUsize,
}

impl<F> CountingExecutor<F>
where
    F: Fn(&PluginDescriptor, &str) -> Result<Value, PluginError> + Send + Sync,
{
    pub(crate) const fn new(call: F) -> Self {
        Self {
            inner: FnExecutor::new(call),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> PluginExecutor for CountingExecutor<F>
where
    F: Fn(&PluginDescriptor, &str) -> Result<Value, PluginError> + Send + Sync,
{
    fn execute(
        &self,
        descriptor: &PluginDescriptor,
        target: &str,
        sink: &dyn DiagnosticSink,
    ) -> Result<Value, PluginError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(descriptor, target, sink)
    }
}

/// Executor that always panics with a fixed message.
pub(crate) struct PanickingExecutor {
    message: &'static str,
}

impl PanickingExecutor {
    pub(crate) const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

impl PluginExecutor for PanickingExecutor {
    fn execute(
        &self,
        _descriptor: &PluginDescriptor,
        _target: &str,
        _sink: &dyn DiagnosticSink,
    ) -> Result<Value, PluginError> {
        panic!("{}", self.message);
    }
}

struct Resolver;

impl Plugin for Resolver {
    fn name(&self) -> &str {
        "resolver"
    }

    fn process(&self, target: &str, sink: &dyn DiagnosticSink) -> Result<Value, PluginError> {
        sink.emit(&format!("resolving {target}"));
        Ok(json!({"ips": ["1.2.3.4"]}))
    }
}

#[test]
fn end_to_end_registry_through_runtime() {
    let mut registry = PluginRegistry::new();
    registry.register(Resolver).expect("register");
    let runtime = PluginRuntime::new(registry);
    let sink = RecordingSink::new();

    let descriptor = PluginDescriptor::new("resolver", Profile::Lite, "lite/resolver.py");
    let outcome = runtime.run(&descriptor, "example.com", &sink);

    assert_eq!(outcome, Outcome::Success(json!({"ips": ["1.2.3.4"]})));
    assert_eq!(sink.lines(), vec!["resolving example.com"]);
}
