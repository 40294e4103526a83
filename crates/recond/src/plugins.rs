//! Plugins compiled into the daemon.
//!
//! A built-in plugin runs when a file with its name is present in a profile
//! directory. Other discovered files are executed as standalone programs.

use std::collections::BTreeSet;
use std::net::{IpAddr, ToSocketAddrs};

use recon_plugins::{DiagnosticSink, Plugin, PluginError, PluginRegistry};
use serde_json::{Value, json};

/// Resolves the target's A and AAAA records through the system resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsResolver;

impl DnsResolver {
    const NAME: &'static str = "dns";
}

impl Plugin for DnsResolver {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(&self, target: &str, sink: &dyn DiagnosticSink) -> Result<Value, PluginError> {
        sink.emit(&format!("Resolving {target}"));
        let addresses = (target, 0)
            .to_socket_addrs()
            .map_err(|error| PluginError::failed(Self::NAME, error.to_string()))?;
        let ips: BTreeSet<IpAddr> = addresses.map(|address| address.ip()).collect();
        sink.emit(&format!("Resolved {} addresses", ips.len()));
        let rendered: Vec<String> = ips.iter().map(ToString::to_string).collect();
        Ok(json!({ "ips": rendered }))
    }
}

/// Builds the registry of built-in plugins.
///
/// # Errors
///
/// Returns [`PluginError::Registration`] if two built-ins share a name.
pub fn builtin_registry() -> Result<PluginRegistry, PluginError> {
    let mut registry = PluginRegistry::new();
    registry.register(DnsResolver)?;
    Ok(registry)
}
