//! Static registry of in-process plugins.
//!
//! Plugins implement [`Plugin`] and are registered once at start-up. The
//! registry then acts as a [`PluginExecutor`]: a descriptor whose name matches
//! a registered plugin is dispatched to it, and any other descriptor reports
//! a missing entry point.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::catalogue::PluginDescriptor;
use crate::error::PluginError;
use crate::runner::PluginExecutor;
use crate::sink::DiagnosticSink;

/// A probe that can be run against a target.
pub trait Plugin: Send + Sync {
    /// Returns the identifier the plugin is registered under.
    fn name(&self) -> &str;

    /// Probes `target` and returns a JSON-serialisable payload.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] describing why the probe failed; the
    /// runtime records it against this plugin only.
    fn process(&self, target: &str, sink: &dyn DiagnosticSink) -> Result<Value, PluginError>;
}

/// Registry of in-process plugins keyed by name.
///
/// # Example
///
/// ```
/// use recon_plugins::{DiagnosticSink, Plugin, PluginError, PluginRegistry};
/// use serde_json::Value;
///
/// struct Noop;
///
/// impl Plugin for Noop {
///     fn name(&self) -> &str {
///         "noop"
///     }
///
///     fn process(&self, _target: &str, _sink: &dyn DiagnosticSink) -> Result<Value, PluginError> {
///         Ok(Value::Null)
///     }
/// }
///
/// let mut registry = PluginRegistry::new();
/// registry.register(Noop).expect("registration succeeds");
/// assert!(registry.get("noop").is_some());
/// ```
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Registration`] if the name is blank or already
    /// registered.
    pub fn register(&mut self, plugin: impl Plugin + 'static) -> Result<(), PluginError> {
        self.register_shared(Arc::new(plugin))
    }

    /// Registers a plugin that is already shared.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Registration`] if the name is blank or already
    /// registered.
    pub fn register_shared(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
        let name = plugin.name().trim().to_owned();
        if name.is_empty() {
            return Err(PluginError::Registration {
                message: String::from("plugin name must not be empty"),
            });
        }
        if self.plugins.contains_key(&name) {
            return Err(PluginError::Registration {
                message: format!("plugin '{name}' is already registered"),
            });
        }
        self.plugins.insert(name, plugin);
        Ok(())
    }

    /// Looks up a plugin by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.get(name)
    }

    /// Returns the registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` when no plugins are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}

impl PluginExecutor for PluginRegistry {
    fn execute(
        &self,
        descriptor: &PluginDescriptor,
        target: &str,
        sink: &dyn DiagnosticSink,
    ) -> Result<Value, PluginError> {
        let plugin = self
            .get(descriptor.name())
            .ok_or_else(|| PluginError::missing_entry_point(descriptor.name()))?;
        plugin.process(target, sink)
    }
}
