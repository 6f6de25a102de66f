//! Pipeline configuration file support.
//!
//! An optional `gauntlet.yaml` in the working directory supplies defaults
//! for the cache file, the event log, the rotation budget, and the plugin
//! discovery directory. Command-line flags always win over config values.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Default name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "gauntlet.yaml";

/// Default hash cache path.
pub const DEFAULT_CACHE_FILE: &str = ".pipeline_cache.json";

/// Default event log path.
pub const DEFAULT_LOG_FILE: &str = "pipeline_errors.jsonl";

/// Configuration file structure for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct PipelineConfig {
    /// Path to the hash cache file.
    pub cache_file: PathBuf,

    /// Path to the aggregated JSONL event log.
    pub log_file: PathBuf,

    /// Rotation budget for the event log, in bytes.
    pub max_log_bytes: u64,

    /// Directory scanned for manifest-driven plugins.
    pub plugin_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            max_log_bytes: gauntlet_jsonl::DEFAULT_MAX_BYTES,
            plugin_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read and a
    /// [`ConfigError::Parse`] if it is not valid YAML of the expected
    /// shape.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        serde_yaml::from_str(&content).map_err(|source| {
            ConfigError::Parse {
                path: path.display().to_string(),
                source,
            }
            .into()
        })
    }

    /// Saves configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError::Yaml`] if serialization fails or an IO
    /// error if the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).map_err(ConfigError::Yaml)?;
        fs::write(path, content).await?;
        Ok(())
    }
}
