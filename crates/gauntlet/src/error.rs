//! Error types for gauntlet pipeline operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Manifest validation errors.
///
/// These are fatal for the offending manifest: discovery refuses to proceed
/// until the manifest set is corrected. Manifests that fail to parse at all
/// are skipped with a warning instead and never reach this stage.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The `name` field is empty.
    #[error("Manifest '{0}' must declare a non-empty name")]
    EmptyName(PathBuf),

    /// Two manifests declare the same name.
    #[error("Duplicate plugin name '{0}'")]
    DuplicateName(String),

    /// Two manifests resolve to the same plugin id.
    #[error("Duplicate plugin id '{0}'")]
    DuplicatePluginId(String),

    /// A dependency references a plugin no manifest (and no registered
    /// plugin) provides.
    #[error("Plugin '{plugin}' depends on unknown plugin '{dependency}'")]
    UnknownDependency {
        /// The plugin declaring the dependency.
        plugin: String,
        /// The dependency that could not be resolved.
        dependency: String,
    },

    /// The manifest dependency graph is cyclic.
    #[error("Cycle detected in manifest dependency graph")]
    CycleDetected,
}

/// Errors raised while instantiating a discovered plugin.
///
/// Fatal for that plugin; other plugins may still load.
#[derive(Debug, Error)]
pub enum PluginLoadError {
    /// The manifest's entrypoint does not match any linked-in constructor.
    #[error("No registered entrypoint '{entrypoint}' for plugin '{plugin}'")]
    UnknownEntrypoint {
        /// The plugin being loaded.
        plugin: String,
        /// The entrypoint name that failed to resolve.
        entrypoint: String,
    },

    /// A plugin specification string did not follow `registry:Entrypoint`.
    #[error("Invalid plugin specification '{0}' (expected 'registry:Entrypoint')")]
    InvalidSpec(String),

    /// The registry namespace of a specification is not linked in.
    #[error("Unknown plugin registry '{0}'")]
    UnknownRegistry(String),

    /// The constructor ran but failed to produce a plugin.
    #[error("Failed to construct plugin '{plugin}': {reason}")]
    Construction {
        /// The plugin being constructed.
        plugin: String,
        /// Why construction failed.
        reason: String,
    },
}

/// Semantic plugin-system errors at runtime.
///
/// These fail the current file; the batch driver reports it with status
/// `"failed"` and continues with the next file.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The per-file induced dependency graph contains a cycle.
    #[error("Cycle detected in plugin dependency graph")]
    CycleDetected,

    /// A plugin id was requested that is not registered.
    #[error("Unknown plugin '{0}'")]
    UnknownPlugin(String),

    /// A plugin with the same id is already registered.
    #[error("Plugin '{0}' is already registered")]
    AlreadyRegistered(String),

    /// A plugin declared an empty id.
    #[error("Plugin must define a non-empty plugin_id")]
    EmptyId,
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse the YAML config file.
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        /// Path to the config file that failed to parse.
        path: String,
        /// The underlying YAML parse error.
        source: serde_yaml::Error,
    },

    /// YAML serialization error.
    #[error("YAML serialization error")]
    Yaml(#[source] serde_yaml::Error),
}

/// The error type for gauntlet operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Manifest validation error.
    #[error("{0}")]
    Manifest(#[from] ManifestError),

    /// Plugin instantiation error.
    #[error("{0}")]
    PluginLoad(#[from] PluginLoadError),

    /// Plugin-system runtime error.
    #[error("{0}")]
    Plugin(#[from] PluginError),

    /// Configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Event log error.
    #[error("Event log error: {0}")]
    Log(#[from] gauntlet_jsonl::Error),

    /// The input path exists but is not a regular file.
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),
}

/// A specialized Result type for gauntlet operations.
pub type Result<T> = std::result::Result<T, Error>;
