//! Pipeline engine: per-file orchestration.
//!
//! For each input file the engine walks a fixed state machine:
//!
//! ```text
//! START -> CACHE_CHECK -> [unchanged] -> SKIPPED
//!                      -> [changed]   -> STAGE -> PLUGINS -> PUBLISH -> LOG -> CACHE_UPDATE -> DONE
//! ```
//!
//! Staging copies the input into a fresh scratch directory; plugins mutate
//! only that copy. A staging or publish failure fails the file without a
//! cache update, so the next run retries it. Plugin faults never fail the
//! file: the execution barrier turns them into failed results. A log-append
//! failure is a warning only.
//!
//! The engine owns its collaborators — the caller constructs the cache,
//! plugin manager, and event log, and hands them in.

use crate::cache::{canonicalize_regular_file, FileHashCache};
use crate::error::Result;
use crate::manager::PluginManager;
use crate::plugin::{run_with_barrier, PluginState};
use crate::report::{EventRecord, FileOutcome, PipelineReport};
use crate::run_id;
use chrono::{DateTime, SecondsFormat, Utc};
use gauntlet_jsonl::RotatingLog;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Coordinates plugin execution, caching, publication, and event logging.
pub struct PipelineEngine {
    manager: PluginManager,
    cache: FileHashCache,
    log: RotatingLog,
    output_dir: PathBuf,
}

impl PipelineEngine {
    /// Creates an engine that publishes into `output_dir`.
    #[must_use]
    pub fn new(
        manager: PluginManager,
        cache: FileHashCache,
        log: RotatingLog,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            manager,
            cache,
            log,
            output_dir: output_dir.into(),
        }
    }

    /// The plugin manager this engine consults.
    #[must_use]
    pub fn manager(&self) -> &PluginManager {
        &self.manager
    }

    /// Processes a batch of files, one outcome record per input.
    ///
    /// An error escaping a single file's procedure is caught and reported
    /// as a `failed` outcome; processing continues with subsequent files.
    pub async fn process_files(&mut self, paths: &[PathBuf]) -> Vec<FileOutcome> {
        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            let outcome = match self.process_file(path).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "file processing failed");
                    FileOutcome::failed(path, err.to_string())
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Runs the per-file state machine for one input path.
    ///
    /// # Errors
    ///
    /// Returns an error when the input is missing or not a regular file,
    /// when the plugin dependency graph is cyclic, or when staging,
    /// publication, or the cache update fails. The batch driver converts
    /// these into `failed` outcomes.
    pub async fn process_file(&mut self, path: &Path) -> Result<FileOutcome> {
        let input = canonicalize_regular_file(path).await?;

        if !self.cache.has_changed(&input).await? {
            debug!(file = %input.display(), "content hash unchanged; skipping");
            return Ok(FileOutcome::skipped(&input));
        }

        let run_id = run_id::generate();
        let timestamp = Utc::now();

        let ordered = self.manager.ordered_plugins(&input)?;
        if ordered.is_empty() {
            debug!(file = %input.display(), "no applicable plugins");
            return Ok(FileOutcome::no_plugins(&input));
        }

        // Stage: plugins work on a scratch copy, never the input itself.
        // The directory is removed when `scratch` goes out of scope.
        let scratch = tempfile::tempdir()?;
        let file_name = input
            .file_name()
            .ok_or_else(|| crate::error::Error::NotAFile(input.clone()))?;
        let scratch_path = scratch.path().join(file_name);
        tokio::fs::copy(&input, &scratch_path).await?;

        let mut state = PluginState::new();
        let mut results = Vec::with_capacity(ordered.len());
        for plugin in ordered {
            results.push(run_with_barrier(plugin, &scratch_path, &mut state).await);
        }

        // Publish the (possibly auto-fixed) scratch copy under a traceable
        // name, then drop the scratch directory.
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let published = self
            .output_dir
            .join(published_file_name(&input, &timestamp, &run_id));
        tokio::fs::copy(&scratch_path, &published).await?;
        drop(scratch);

        let report = PipelineReport::assemble(
            run_id,
            input.display().to_string(),
            published.display().to_string(),
            timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            results,
        );

        let sidecar = sidecar_path(&published);
        let payload = serde_json::to_vec_pretty(&report)?;
        tokio::fs::write(&sidecar, payload).await?;

        // One aggregated event record per plugin result, in execution
        // order. Append failures must not fail a file that already
        // published.
        for result in &report.plugin_results {
            let record = EventRecord::for_result(&report, result);
            if let Err(err) = self.log.append(&record).await {
                warn!(
                    log = %self.log.path().display(),
                    error = %err,
                    "failed to append event record; continuing"
                );
            }
        }

        self.cache
            .mark_validated(&input, report.summary.total_errors > 0)
            .await?;
        self.cache.save().await?;

        info!(
            file = %report.file_in,
            run_id = %report.run_id,
            plugins_run = report.summary.plugins_run,
            total_errors = report.summary.total_errors,
            "file processed"
        );
        Ok(FileOutcome::processed(report))
    }
}

/// Builds the published file name:
/// `<stem>_VALIDATED_<YYYYMMDD_HHMMSS>_<run_id><suffix>`.
fn published_file_name(input: &Path, timestamp: &DateTime<Utc>, run_id: &str) -> String {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = input
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let stamp = timestamp.format("%Y%m%d_%H%M%S");
    format!("{stem}_VALIDATED_{stamp}_{run_id}{suffix}")
}

/// Sidecar report path: the published name with `.json` appended, so the
/// suffix chain stays visible.
fn sidecar_path(published: &Path) -> PathBuf {
    let mut name = published
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".json");
    published.with_file_name(name)
}
