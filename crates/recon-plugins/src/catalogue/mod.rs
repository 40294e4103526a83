//! Plugin discovery for scan profiles.
//!
//! Each [`Profile`] owns a directory under the catalogue root
//! (`<root>/lite`, `<root>/deep`). Every regular file in that directory whose
//! name does not start with `_` or `.` is a plugin, identified by its file
//! stem. Resolution is deterministic: descriptors are returned sorted by name
//! and, when two files share a stem, the one whose file name sorts first
//! wins.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::PluginError;
use crate::profile::Profile;

/// Tracing target for discovery operations.
const CATALOGUE_TARGET: &str = "recon_plugins::catalogue";

/// Identity of one discovered plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDescriptor {
    name: String,
    profile: Profile,
    path: PathBuf,
}

impl PluginDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, profile: Profile, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            profile,
            path: path.into(),
        }
    }

    /// Returns the stable plugin identifier.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the profile the plugin was discovered under.
    #[must_use]
    pub const fn profile(&self) -> Profile {
        self.profile
    }

    /// Returns the file the plugin was discovered from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resolves plugin descriptor sets from a directory tree.
///
/// # Example
///
/// ```
/// use recon_plugins::{PluginCatalogue, Profile};
///
/// let catalogue = PluginCatalogue::new("/nonexistent/plugins");
/// let descriptors = catalogue.resolve(Profile::Lite).expect("missing roots are empty");
/// assert!(descriptors.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct PluginCatalogue {
    root: PathBuf,
}

impl PluginCatalogue {
    /// Creates a catalogue rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the catalogue root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the discovery directory for `profile`.
    #[must_use]
    pub fn directory(&self, profile: Profile) -> PathBuf {
        self.root.join(profile.directory_name())
    }

    /// Resolves the ordered descriptor set for `profile`.
    ///
    /// A missing discovery directory yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Discovery`] when the directory exists but cannot
    /// be listed.
    pub fn resolve(&self, profile: Profile) -> Result<Vec<PluginDescriptor>, PluginError> {
        let directory = self.directory(profile);
        let entries = match fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(
                    target: CATALOGUE_TARGET,
                    directory = %directory.display(),
                    %profile,
                    "plugin directory absent"
                );
                return Ok(Vec::new());
            }
            Err(error) => return Err(discovery_error(&directory, error)),
        };

        let mut files = Vec::new();
        for item in entries {
            let entry = item.map_err(|error| discovery_error(&directory, error))?;
            files.push((entry.file_name(), entry.path()));
        }
        files.sort_by(|left, right| left.0.cmp(&right.0));

        let mut by_name: BTreeMap<String, PathBuf> = BTreeMap::new();
        for (file_name, path) in files {
            let Some(name) = plugin_name(&file_name) else {
                continue;
            };
            if !is_regular_file(&path) {
                continue;
            }
            if let Some(existing) = by_name.get(&name) {
                warn!(
                    target: CATALOGUE_TARGET,
                    plugin = %name,
                    kept = %existing.display(),
                    skipped = %path.display(),
                    "duplicate plugin name"
                );
                continue;
            }
            by_name.insert(name, path);
        }

        Ok(by_name
            .into_iter()
            .map(|(name, path)| PluginDescriptor::new(name, profile, path))
            .collect())
    }
}

/// Derives the plugin identifier from a file name, rejecting non-plugins.
fn plugin_name(file_name: &OsStr) -> Option<String> {
    let text = file_name.to_str()?;
    if text.starts_with('_') || text.starts_with('.') {
        return None;
    }
    let stem = Path::new(text).file_stem()?.to_str()?;
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_owned())
    }
}

fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|metadata| metadata.is_file())
}

fn discovery_error(directory: &Path, source: io::Error) -> PluginError {
    PluginError::Discovery {
        path: directory.to_path_buf(),
        source: Arc::new(source),
    }
}

#[cfg(test)]
mod tests;
