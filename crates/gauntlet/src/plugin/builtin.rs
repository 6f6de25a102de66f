//! Reference validators linked into the default registry.
//!
//! These are deliberately small: [`HeaderPlugin`] demonstrates an auto-fixing
//! validator, [`AnalysisPlugin`] a read-only one that depends on it. They
//! double as the fixtures the CLI scenarios run against.

use crate::manifest::PluginManifest;
use crate::plugin::{PluginResult, PluginState, ValidationError, ValidatorPlugin};
use async_trait::async_trait;
use std::path::Path;

/// Banner line the header plugin maintains.
const HEADER_LINE: &str = "HEADER\n";

/// Identity and applicability settings, overridable by a manifest.
#[derive(Debug, Clone)]
struct PluginIdentity {
    plugin_id: String,
    name: String,
    requires: Vec<String>,
    file_extensions: Vec<String>,
    enabled: bool,
}

impl PluginIdentity {
    fn new(plugin_id: &str, name: &str, requires: &[&str]) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            name: name.to_string(),
            requires: requires.iter().map(|id| (*id).to_string()).collect(),
            file_extensions: Vec::new(),
            enabled: true,
        }
    }

    fn from_manifest(manifest: &PluginManifest) -> Self {
        Self {
            plugin_id: manifest.plugin_id().to_string(),
            name: manifest.name.clone(),
            requires: manifest.dependencies.clone(),
            file_extensions: manifest.file_extensions.clone(),
            enabled: manifest.enabled,
        }
    }
}

/// Prepends a `HEADER` banner line when the file lacks one.
///
/// The insertion is an auto-fix: it mutates the scratch copy in place and is
/// surfaced as an `info` finding with `auto_fixed: true`.
#[derive(Debug)]
pub struct HeaderPlugin {
    identity: PluginIdentity,
}

impl HeaderPlugin {
    /// Creates the plugin with its built-in identity (`header`).
    #[must_use]
    pub fn new() -> Self {
        Self {
            identity: PluginIdentity::new("header", "Header Writer", &[]),
        }
    }

    /// Creates the plugin with identity and applicability taken from a
    /// manifest.
    #[must_use]
    pub fn from_manifest(manifest: &PluginManifest) -> Self {
        Self {
            identity: PluginIdentity::from_manifest(manifest),
        }
    }
}

impl Default for HeaderPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ValidatorPlugin for HeaderPlugin {
    fn plugin_id(&self) -> &str {
        &self.identity.plugin_id
    }

    fn name(&self) -> &str {
        &self.identity.name
    }

    fn requires(&self) -> &[String] {
        &self.identity.requires
    }

    fn file_extensions(&self) -> &[String] {
        &self.identity.file_extensions
    }

    fn enabled(&self) -> bool {
        self.identity.enabled
    }

    async fn run(&self, path: &Path, state: &mut PluginState) -> anyhow::Result<PluginResult> {
        let original = tokio::fs::read_to_string(path).await?;
        let mut result = PluginResult::success(self.plugin_id(), self.name());

        if original.starts_with(HEADER_LINE) {
            result.details.insert("added_header".to_string(), false.into());
        } else {
            tokio::fs::write(path, format!("{HEADER_LINE}{original}")).await?;
            result.errors.push(
                ValidationError::info(self.name(), "missing HEADER banner inserted")
                    .with_file(path.display().to_string())
                    .auto_fixed(),
            );
            result.auto_fixed_count = 1;
            result.details.insert("added_header".to_string(), true.into());
        }

        state.insert("header.present", true)?;
        Ok(result)
    }
}

/// Reports a warning for every blank line in the file.
///
/// Depends on [`HeaderPlugin`] so line numbers refer to the post-fix
/// content.
#[derive(Debug)]
pub struct AnalysisPlugin {
    identity: PluginIdentity,
}

impl AnalysisPlugin {
    /// Creates the plugin with its built-in identity (`analysis`, requiring
    /// `header`).
    #[must_use]
    pub fn new() -> Self {
        Self {
            identity: PluginIdentity::new("analysis", "Line Analyzer", &["header"]),
        }
    }

    /// Creates the plugin with identity and applicability taken from a
    /// manifest.
    #[must_use]
    pub fn from_manifest(manifest: &PluginManifest) -> Self {
        Self {
            identity: PluginIdentity::from_manifest(manifest),
        }
    }
}

impl Default for AnalysisPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ValidatorPlugin for AnalysisPlugin {
    fn plugin_id(&self) -> &str {
        &self.identity.plugin_id
    }

    fn name(&self) -> &str {
        &self.identity.name
    }

    fn requires(&self) -> &[String] {
        &self.identity.requires
    }

    fn file_extensions(&self) -> &[String] {
        &self.identity.file_extensions
    }

    fn enabled(&self) -> bool {
        self.identity.enabled
    }

    async fn run(&self, path: &Path, state: &mut PluginState) -> anyhow::Result<PluginResult> {
        let content = tokio::fs::read_to_string(path).await?;
        let mut result = PluginResult::success(self.plugin_id(), self.name());

        let mut line_count: u64 = 0;
        for (index, line) in content.lines().enumerate() {
            line_count += 1;
            if line.trim().is_empty() {
                result.errors.push(
                    ValidationError::warning(self.name(), "blank line detected")
                        .with_file(path.display().to_string())
                        .with_line(index as u32 + 1),
                );
            }
        }

        result
            .details
            .insert("line_count".to_string(), line_count.into());
        state.insert("analysis.line_count", line_count)?;
        Ok(result)
    }
}
