//! Validator plugin contract.
//!
//! Every validator implements [`ValidatorPlugin`]: it advertises a stable
//! id, a human name, the plugins that must run before it, and an optional
//! file-extension filter; [`ValidatorPlugin::run`] receives the scratch copy
//! of the file and may mutate it in place when performing auto-fixes.
//!
//! The engine never calls `run` directly: [`run_with_barrier`] wraps every
//! invocation, measuring wall-clock duration and converting any fault into
//! a [`PluginResult`] with `success == false` and a synthetic error, so one
//! misbehaving plugin cannot abort the file's pass.

pub mod builtin;
pub mod registry;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

/// Severity of a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A defect that makes the file invalid.
    Error,
    /// A suspicious construct that does not invalidate the file.
    Warning,
    /// Informational, including auto-fix notices.
    Info,
}

/// Structured representation of a validation error or warning.
///
/// Serialized field order is fixed by declaration order; `extra` is omitted
/// when empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// The tool or plugin that produced the finding.
    pub tool: String,
    /// Finding severity.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// File the finding applies to.
    pub file: Option<String>,
    /// 1-based line number, when known.
    pub line: Option<u32>,
    /// 1-based column number, when known.
    pub column: Option<u32>,
    /// Tool-specific rule code.
    pub code: Option<String>,
    /// Whether the plugin corrected the issue in place.
    pub auto_fixed: bool,
    /// Tool-specific extra payload.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ValidationError {
    /// Creates a finding with the given severity and no location info.
    #[must_use]
    pub fn new(tool: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            severity,
            message: message.into(),
            file: None,
            line: None,
            column: None,
            code: None,
            auto_fixed: false,
            extra: BTreeMap::new(),
        }
    }

    /// Convenience constructor for an `error` finding.
    #[must_use]
    pub fn error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(tool, Severity::Error, message)
    }

    /// Convenience constructor for a `warning` finding.
    #[must_use]
    pub fn warning(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(tool, Severity::Warning, message)
    }

    /// Convenience constructor for an `info` finding.
    #[must_use]
    pub fn info(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(tool, Severity::Info, message)
    }

    /// Attaches the file the finding applies to.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Attaches a 1-based line number.
    #[must_use]
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// Marks the finding as corrected in place.
    #[must_use]
    pub fn auto_fixed(mut self) -> Self {
        self.auto_fixed = true;
        self
    }
}

/// Result returned by one plugin execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginResult {
    /// Stable id of the plugin that ran.
    pub plugin_id: String,
    /// Human-readable plugin name.
    pub name: String,
    /// Whether the plugin completed without faulting.
    pub success: bool,
    /// Wall-clock duration of the run in seconds. Plugins may leave this at
    /// zero; the execution barrier substitutes the measured duration.
    pub duration_s: f64,
    /// Number of issues the plugin corrected in place.
    #[serde(rename = "auto_fixed")]
    pub auto_fixed_count: u64,
    /// Findings produced by the plugin.
    pub errors: Vec<ValidationError>,
    /// Plugin-specific details carried into the report.
    pub details: BTreeMap<String, serde_json::Value>,
}

impl PluginResult {
    /// Creates an empty successful result for the given plugin identity.
    #[must_use]
    pub fn success(plugin_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            name: name.into(),
            success: true,
            duration_s: 0.0,
            auto_fixed_count: 0,
            errors: Vec::new(),
            details: BTreeMap::new(),
        }
    }
}

/// Shared mutable state threaded through one file's plugin pass.
///
/// Plugins may read and write arbitrary keys to communicate; later plugins
/// observe values written by earlier ones.
#[derive(Debug, Default)]
pub struct PluginState {
    values: BTreeMap<String, serde_json::Value>,
}

impl PluginState {
    /// Creates an empty state bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value fails to serialize.
    pub fn insert<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), serde_json::Error> {
        self.values.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Returns the raw value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Returns the value under `key` deserialized as `T`, if present and of
    /// the right shape.
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Number of keys in the bag.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when the bag holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for dyn ValidatorPlugin + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorPlugin")
            .field("plugin_id", &self.plugin_id())
            .field("name", &self.name())
            .finish()
    }
}

/// Capability interface implemented by every validator plugin.
#[async_trait]
pub trait ValidatorPlugin: Send + Sync {
    /// Stable plugin id used in dependency declarations and reports.
    fn plugin_id(&self) -> &str;

    /// Human-readable plugin name.
    fn name(&self) -> &str;

    /// Plugin ids that must run before this plugin.
    fn requires(&self) -> &[String] {
        &[]
    }

    /// File extensions this plugin applies to; empty means all files.
    fn file_extensions(&self) -> &[String] {
        &[]
    }

    /// Disabled plugins never process files.
    fn enabled(&self) -> bool {
        true
    }

    /// Whether this plugin should run for `path`.
    ///
    /// Disabled plugins never apply. Otherwise the file's suffix is matched
    /// case-insensitively against [`file_extensions`](Self::file_extensions);
    /// listed extensions may be written with or without the leading dot.
    fn can_process(&self, path: &Path) -> bool {
        if !self.enabled() {
            return false;
        }
        let extensions = self.file_extensions();
        if extensions.is_empty() {
            return true;
        }
        let Some(suffix) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        let suffix = suffix.to_lowercase();
        extensions
            .iter()
            .any(|ext| ext.trim_start_matches('.').to_lowercase() == suffix)
    }

    /// Executes the plugin against the scratch copy at `path`.
    ///
    /// The plugin mutates the file in place when performing auto-fixes.
    /// Returning an error counts as a fault; the execution barrier converts
    /// it into a failed [`PluginResult`] rather than aborting the file.
    async fn run(&self, path: &Path, state: &mut PluginState) -> anyhow::Result<PluginResult>;
}

/// Runs a plugin inside the failure barrier.
///
/// Measures wall-clock duration, substitutes it when the plugin reports a
/// non-positive `duration_s`, and converts a fault into a `PluginResult`
/// with `success == false` and a single synthetic `error`-severity finding.
pub async fn run_with_barrier(
    plugin: &dyn ValidatorPlugin,
    path: &Path,
    state: &mut PluginState,
) -> PluginResult {
    let start = Instant::now();
    match plugin.run(path, state).await {
        Ok(mut result) => {
            if result.duration_s <= 0.0 {
                result.duration_s = start.elapsed().as_secs_f64();
            }
            result
        }
        Err(fault) => PluginResult {
            plugin_id: plugin.plugin_id().to_string(),
            name: plugin.name().to_string(),
            success: false,
            duration_s: start.elapsed().as_secs_f64(),
            auto_fixed_count: 0,
            errors: vec![
                ValidationError::error(plugin.name(), fault.to_string())
                    .with_file(path.display().to_string()),
            ],
            details: BTreeMap::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ExtensionPlugin {
        extensions: Vec<String>,
        enabled: bool,
    }

    #[async_trait]
    impl ValidatorPlugin for ExtensionPlugin {
        fn plugin_id(&self) -> &str {
            "ext"
        }

        fn name(&self) -> &str {
            "Extension Filter"
        }

        fn file_extensions(&self) -> &[String] {
            &self.extensions
        }

        fn enabled(&self) -> bool {
            self.enabled
        }

        async fn run(&self, _path: &Path, _state: &mut PluginState) -> anyhow::Result<PluginResult> {
            Ok(PluginResult::success(self.plugin_id(), self.name()))
        }
    }

    fn plugin(extensions: &[&str], enabled: bool) -> ExtensionPlugin {
        ExtensionPlugin {
            extensions: extensions.iter().map(|ext| (*ext).to_string()).collect(),
            enabled,
        }
    }

    #[test]
    fn empty_extension_list_matches_everything() {
        let plugin = plugin(&[], true);
        assert!(plugin.can_process(Path::new("anything.weird")));
        assert!(plugin.can_process(Path::new("no_extension")));
    }

    #[test]
    fn extension_match_is_case_insensitive_and_dot_agnostic() {
        let plugin = plugin(&[".txt", "MD"], true);
        assert!(plugin.can_process(Path::new("notes.TXT")));
        assert!(plugin.can_process(Path::new("readme.md")));
        assert!(!plugin.can_process(Path::new("script.py")));
        assert!(!plugin.can_process(Path::new("no_extension")));
    }

    #[test]
    fn disabled_plugin_never_applies() {
        let plugin = plugin(&[], false);
        assert!(!plugin.can_process(Path::new("anything.txt")));
    }

    struct FaultyPlugin;

    #[async_trait]
    impl ValidatorPlugin for FaultyPlugin {
        fn plugin_id(&self) -> &str {
            "boom"
        }

        fn name(&self) -> &str {
            "Boom"
        }

        async fn run(&self, _path: &Path, _state: &mut PluginState) -> anyhow::Result<PluginResult> {
            anyhow::bail!("deliberate fault")
        }
    }

    #[tokio::test]
    async fn barrier_converts_faults_into_failed_results() {
        let mut state = PluginState::new();
        let result = run_with_barrier(&FaultyPlugin, Path::new("/tmp/input.txt"), &mut state).await;

        assert!(!result.success);
        assert_eq!(result.plugin_id, "boom");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].severity, Severity::Error);
        assert!(result.errors[0].message.contains("deliberate fault"));
        assert_eq!(result.errors[0].file.as_deref(), Some("/tmp/input.txt"));
        assert!(result.duration_s >= 0.0);
    }

    struct ZeroDurationPlugin;

    #[async_trait]
    impl ValidatorPlugin for ZeroDurationPlugin {
        fn plugin_id(&self) -> &str {
            "zero"
        }

        fn name(&self) -> &str {
            "Zero Duration"
        }

        async fn run(&self, _path: &Path, _state: &mut PluginState) -> anyhow::Result<PluginResult> {
            Ok(PluginResult::success(self.plugin_id(), self.name()))
        }
    }

    #[tokio::test]
    async fn barrier_substitutes_measured_duration() {
        let mut state = PluginState::new();
        let result =
            run_with_barrier(&ZeroDurationPlugin, Path::new("/tmp/input.txt"), &mut state).await;
        assert!(result.duration_s > 0.0);
    }

    #[test]
    fn state_round_trips_typed_values() {
        let mut state = PluginState::new();
        state.insert("line_count", 42u64).unwrap();
        state.insert("label", "checked").unwrap();

        assert_eq!(state.get_as::<u64>("line_count"), Some(42));
        assert_eq!(state.get_as::<String>("label").as_deref(), Some("checked"));
        assert!(state.get("missing").is_none());
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn validation_error_serializes_with_stable_field_order() {
        let error = ValidationError::warning("analysis", "blank line detected").with_line(2);
        let json = serde_json::to_string(&error).unwrap();
        let tool_pos = json.find("\"tool\"").unwrap();
        let severity_pos = json.find("\"severity\"").unwrap();
        let auto_fixed_pos = json.find("\"auto_fixed\"").unwrap();
        assert!(tool_pos < severity_pos && severity_pos < auto_fixed_pos);
        // Empty extra payload is omitted entirely.
        assert!(!json.contains("extra"));
    }
}
