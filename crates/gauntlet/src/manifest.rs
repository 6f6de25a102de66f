//! Plugin manifest schema.
//!
//! A manifest is the JSON file (`manifest.json`) each discovered plugin
//! directory carries. It declares the plugin's identity, its entrypoint in
//! the linked-in constructor registry, its dependencies, and the file
//! extensions it applies to.

use crate::error::ManifestError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the manifest file inside a plugin directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Declarative description of a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Human-readable plugin name. Required and unique across a discovery
    /// pass.
    pub name: String,

    /// Constructor name resolved against the plugin registry.
    #[serde(default = "default_entrypoint")]
    pub entrypoint: String,

    /// Plugin ids that must run before this plugin.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// File extensions this plugin applies to; empty means all files.
    #[serde(default)]
    pub file_extensions: Vec<String>,

    /// Disabled plugins are loaded but never selected.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Stable plugin id; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
}

fn default_entrypoint() -> String {
    "Plugin".to_string()
}

fn default_enabled() -> bool {
    true
}

impl PluginManifest {
    /// Creates a minimal manifest for the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entrypoint: default_entrypoint(),
            dependencies: Vec::new(),
            file_extensions: Vec::new(),
            enabled: default_enabled(),
            plugin_id: None,
        }
    }

    /// The stable plugin id: the explicit `plugin_id` when set, otherwise
    /// the name.
    #[must_use]
    pub fn plugin_id(&self) -> &str {
        self.plugin_id.as_deref().unwrap_or(&self.name)
    }

    /// Validates manifest-local invariants.
    ///
    /// `manifest_path` is only used for error context.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::EmptyName`] when `name` is empty or
    /// whitespace.
    pub fn validate(&self, manifest_path: &Path) -> Result<(), ManifestError> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::EmptyName(manifest_path.to_path_buf()));
        }
        Ok(())
    }
}
