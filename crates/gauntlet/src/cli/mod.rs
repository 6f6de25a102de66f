//! CLI argument parsing and pipeline driver.
//!
//! The binary takes one or more input files, a required output directory,
//! and one or more plugin specifications, then prints a JSON array with one
//! outcome record per input on stdout:
//!
//! ```bash
//! gauntlet sample.txt --output out \
//!     --plugin builtin:HeaderPlugin --plugin builtin:AnalysisPlugin
//! ```
//!
//! Per-file failures are reported inside the JSON array, not via the exit
//! code; a non-zero exit means an argument error or an unrecoverable
//! engine failure.

mod validators;

pub use validators::validate_plugin_spec;

use crate::cache::FileHashCache;
use crate::config::{PipelineConfig, CONFIG_FILE_NAME};
use crate::engine::PipelineEngine;
use crate::manager::PluginManager;
use crate::plugin::registry::PluginRegistry;
use anyhow::Result;
use clap::Parser;
use gauntlet_jsonl::RotatingLog;
use std::path::{Path, PathBuf};

/// Gauntlet - a deterministic, incremental file-validation pipeline
///
/// Runs an ordered collection of validator plugins against each input file
/// in an isolated scratch workspace, publishes the (possibly auto-fixed)
/// result under a traceable name, and skips files whose content hash has
/// not changed since the last run.
#[derive(Parser, Debug)]
#[command(name = "gauntlet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input files to validate
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory that receives published copies and sidecar reports
    #[arg(short, long)]
    pub output: PathBuf,

    /// Plugin specification in 'registry:Entrypoint' format.
    /// Can be provided multiple times.
    #[arg(long = "plugin", required = true, value_parser = validate_plugin_spec)]
    pub plugins: Vec<String>,

    /// Path to the hash cache file
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Path to the aggregated JSONL event log
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Rotation budget for the event log, in bytes
    #[arg(long)]
    pub max_log_bytes: Option<u64>,

    /// Directory scanned for manifest-driven plugins
    #[arg(long)]
    pub plugin_dir: Option<PathBuf>,

    /// Path to a YAML config file (defaults to ./gauntlet.yaml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Parse CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing).
    ///
    /// # Errors
    ///
    /// Returns the clap error for invalid arguments.
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Executes the pipeline and prints the outcome array on stdout.
    ///
    /// # Errors
    ///
    /// Returns an error for unrecoverable failures: unresolvable plugin
    /// specs, a broken config file, or a failed plugin discovery pass.
    pub async fn execute(&self) -> Result<()> {
        let config = self.resolve_config().await?;

        let cache_file = self
            .cache
            .clone()
            .unwrap_or_else(|| config.cache_file.clone());
        let log_file = self.log.clone().unwrap_or_else(|| config.log_file.clone());
        let max_log_bytes = self.max_log_bytes.unwrap_or(config.max_log_bytes);
        let plugin_dir = self.plugin_dir.clone().or_else(|| config.plugin_dir.clone());

        let registry = PluginRegistry::builtin();
        let mut manager = PluginManager::new();
        for spec in &self.plugins {
            manager.register(registry.construct_spec(spec)?)?;
        }
        if let Some(dir) = &plugin_dir {
            manager.discover(dir, &registry).await?;
        }

        let cache = FileHashCache::open(&cache_file).await;
        let log = RotatingLog::with_max_bytes(&log_file, max_log_bytes);
        let mut engine = PipelineEngine::new(manager, cache, log, self.output.clone());

        let outcomes = engine.process_files(&self.inputs).await;
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        Ok(())
    }

    /// Loads the config file: the explicit `--config` path when given
    /// (missing file is then an error), otherwise `./gauntlet.yaml` when it
    /// exists, otherwise built-in defaults.
    async fn resolve_config(&self) -> Result<PipelineConfig> {
        if let Some(path) = &self.config {
            return Ok(PipelineConfig::load(path).await?);
        }
        let default_path = Path::new(CONFIG_FILE_NAME);
        if default_path.exists() {
            return Ok(PipelineConfig::load(default_path).await?);
        }
        Ok(PipelineConfig::default())
    }
}
