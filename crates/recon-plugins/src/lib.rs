//! Plugin discovery and fault-isolated execution for recon jobs.
//!
//! A job runs every plugin belonging to its [`Profile`] against a single
//! target. This crate supplies the three pieces the job engine needs:
//!
//! - [`PluginCatalogue`] resolves the ordered [`PluginDescriptor`] set for a
//!   profile by scanning `<root>/<profile>`;
//! - [`PluginExecutor`] implementations perform one invocation, either through
//!   the in-process [`PluginRegistry`] populated once at start-up or by running
//!   the discovered file as an executable ([`ProcessExecutor`]);
//! - [`PluginRuntime`] wraps an executor and converts every error and panic
//!   into an [`Outcome`], so one plugin can never abort the others.
//!
//! Diagnostics raised while a plugin runs flow through the [`DiagnosticSink`]
//! handed to each invocation; the job engine supplies a sink bound to the job
//! that owns the invocation.
//!
//! # Example
//!
//! ```
//! use recon_plugins::{
//!     DiagnosticSink, DiscardSink, Outcome, Plugin, PluginDescriptor, PluginError,
//!     PluginRegistry, PluginRuntime, Profile,
//! };
//! use serde_json::{Value, json};
//!
//! struct Resolver;
//!
//! impl Plugin for Resolver {
//!     fn name(&self) -> &str {
//!         "resolver"
//!     }
//!
//!     fn process(&self, _target: &str, sink: &dyn DiagnosticSink) -> Result<Value, PluginError> {
//!         sink.emit("resolving");
//!         Ok(json!({"ips": ["1.2.3.4"]}))
//!     }
//! }
//!
//! let mut registry = PluginRegistry::new();
//! registry.register(Resolver).expect("registration succeeds");
//!
//! let runtime = PluginRuntime::new(registry);
//! let descriptor = PluginDescriptor::new("resolver", Profile::Lite, "plugins/lite/resolver.py");
//! let outcome = runtime.run(&descriptor, "example.com", &DiscardSink);
//! assert_eq!(outcome, Outcome::Success(json!({"ips": ["1.2.3.4"]})));
//! ```

pub mod catalogue;
pub mod error;
pub mod process;
pub mod profile;
pub mod registry;
pub mod runner;
pub mod sink;

#[cfg(test)]
mod tests;

pub use self::catalogue::{PluginCatalogue, PluginDescriptor};
pub use self::error::PluginError;
pub use self::process::ProcessExecutor;
pub use self::profile::{Profile, ProfileParseError};
pub use self::registry::{Plugin, PluginRegistry};
pub use self::runner::{FallbackExecutor, Outcome, PluginExecutor, PluginRuntime};
pub use self::sink::{DiagnosticSink, DiscardSink};
#[cfg(any(test, feature = "test-support"))]
pub use self::sink::RecordingSink;
