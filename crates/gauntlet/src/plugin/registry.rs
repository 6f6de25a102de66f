//! Compile-time plugin registry.
//!
//! Plugins are linked into the binary; the registry maps entrypoint names
//! to constructors so both the CLI's `--plugin registry:Entrypoint` specs
//! and manifest `entrypoint` fields resolve without any runtime code
//! loading. An entrypoint the registry does not know is the moral
//! equivalent of a missing implementation file and surfaces as a
//! [`PluginLoadError`].

use crate::error::PluginLoadError;
use crate::manifest::PluginManifest;
use crate::plugin::builtin::{AnalysisPlugin, HeaderPlugin};
use crate::plugin::ValidatorPlugin;
use std::collections::BTreeMap;

/// Registry namespace the built-in constructors live under.
pub const BUILTIN_REGISTRY: &str = "builtin";

/// Constructs a plugin, optionally driven by a discovered manifest.
///
/// `None` means the plugin was requested directly (CLI spec) and should use
/// its built-in identity; `Some` means a manifest governs identity,
/// dependencies, and applicability.
type Constructor =
    fn(Option<&PluginManifest>) -> Result<Box<dyn ValidatorPlugin>, PluginLoadError>;

/// Maps entrypoint names to linked-in plugin constructors.
///
/// The store is a `BTreeMap` so iteration and lookups are deterministic
/// regardless of registration order.
pub struct PluginRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Creates a registry pre-populated with the built-in validators.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("HeaderPlugin", construct_header);
        registry.register("AnalysisPlugin", construct_analysis);
        registry
    }

    /// Registers a constructor under `entrypoint`, replacing any previous
    /// registration.
    pub fn register(&mut self, entrypoint: impl Into<String>, constructor: Constructor) {
        self.constructors.insert(entrypoint.into(), constructor);
    }

    /// Entrypoint names known to this registry, in deterministic order.
    #[must_use]
    pub fn entrypoints(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Constructs the plugin a manifest describes.
    ///
    /// # Errors
    ///
    /// Returns [`PluginLoadError::UnknownEntrypoint`] when the manifest's
    /// entrypoint is not registered, or the constructor's own error when
    /// instantiation fails.
    pub fn construct(
        &self,
        manifest: &PluginManifest,
    ) -> Result<Box<dyn ValidatorPlugin>, PluginLoadError> {
        let constructor = self.constructors.get(&manifest.entrypoint).ok_or_else(|| {
            PluginLoadError::UnknownEntrypoint {
                plugin: manifest.name.clone(),
                entrypoint: manifest.entrypoint.clone(),
            }
        })?;
        constructor(Some(manifest))
    }

    /// Constructs a plugin from a `registry:Entrypoint` specification.
    ///
    /// # Errors
    ///
    /// Returns [`PluginLoadError::InvalidSpec`] for a malformed spec,
    /// [`PluginLoadError::UnknownRegistry`] when the namespace is not
    /// linked in, and [`PluginLoadError::UnknownEntrypoint`] when the
    /// entrypoint does not resolve.
    pub fn construct_spec(&self, spec: &str) -> Result<Box<dyn ValidatorPlugin>, PluginLoadError> {
        let Some((registry, entrypoint)) = spec.split_once(':') else {
            return Err(PluginLoadError::InvalidSpec(spec.to_string()));
        };
        if registry.is_empty() || entrypoint.is_empty() {
            return Err(PluginLoadError::InvalidSpec(spec.to_string()));
        }
        if registry != BUILTIN_REGISTRY {
            return Err(PluginLoadError::UnknownRegistry(registry.to_string()));
        }
        let constructor = self.constructors.get(entrypoint).ok_or_else(|| {
            PluginLoadError::UnknownEntrypoint {
                plugin: spec.to_string(),
                entrypoint: entrypoint.to_string(),
            }
        })?;
        constructor(None)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn construct_header(
    manifest: Option<&PluginManifest>,
) -> Result<Box<dyn ValidatorPlugin>, PluginLoadError> {
    Ok(Box::new(match manifest {
        Some(manifest) => HeaderPlugin::from_manifest(manifest),
        None => HeaderPlugin::new(),
    }))
}

fn construct_analysis(
    manifest: Option<&PluginManifest>,
) -> Result<Box<dyn ValidatorPlugin>, PluginLoadError> {
    Ok(Box::new(match manifest {
        Some(manifest) => AnalysisPlugin::from_manifest(manifest),
        None => AnalysisPlugin::new(),
    }))
}
