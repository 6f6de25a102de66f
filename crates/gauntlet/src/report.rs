//! Report and event record shapes.
//!
//! Everything the pipeline emits — the per-file sidecar report, the
//! aggregated JSONL event records, and the outcome array printed by the
//! batch driver — is defined here. Field order in the serialized JSON is
//! fixed by declaration order.

use crate::plugin::{PluginResult, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Aggregate counters for one file's plugin pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Number of plugins that ran.
    pub plugins_run: usize,
    /// Total findings across all plugin results.
    pub total_errors: usize,
    /// Total issues corrected in place.
    pub auto_fixed: u64,
}

/// Per-file report written as the sidecar JSON next to the published file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Run identifier for this per-file invocation.
    pub run_id: String,
    /// Canonical input path.
    pub file_in: String,
    /// Published output path.
    pub file_out: String,
    /// RFC-3339 UTC timestamp captured at the start of the run.
    pub timestamp_utc: String,
    /// Aggregate counters.
    pub summary: ReportSummary,
    /// One entry per executed plugin, in execution order.
    pub plugin_results: Vec<PluginResult>,
}

impl PipelineReport {
    /// Assembles a report, deriving the summary from the plugin results.
    #[must_use]
    pub fn assemble(
        run_id: String,
        file_in: String,
        file_out: String,
        timestamp_utc: String,
        plugin_results: Vec<PluginResult>,
    ) -> Self {
        let summary = ReportSummary {
            plugins_run: plugin_results.len(),
            total_errors: plugin_results.iter().map(|result| result.errors.len()).sum(),
            auto_fixed: plugin_results
                .iter()
                .map(|result| result.auto_fixed_count)
                .sum(),
        };
        Self {
            run_id,
            file_in,
            file_out,
            timestamp_utc,
            summary,
            plugin_results,
        }
    }
}

/// One aggregated event-log record: a single plugin result in context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Run identifier of the per-file invocation.
    pub run_id: String,
    /// RFC-3339 UTC timestamp of the run.
    pub timestamp_utc: String,
    /// Canonical input path.
    pub file_in: String,
    /// Published output path.
    pub file_out: String,
    /// Stable id of the plugin.
    pub plugin_id: String,
    /// Human-readable plugin name.
    pub plugin_name: String,
    /// Whether the plugin completed without faulting.
    pub success: bool,
    /// Wall-clock duration of the plugin run in seconds.
    pub duration_s: f64,
    /// Issues the plugin corrected in place.
    pub auto_fixed: u64,
    /// Findings produced by the plugin.
    pub errors: Vec<ValidationError>,
}

impl EventRecord {
    /// Builds the event record for one plugin result of a report.
    #[must_use]
    pub fn for_result(report: &PipelineReport, result: &PluginResult) -> Self {
        Self {
            run_id: report.run_id.clone(),
            timestamp_utc: report.timestamp_utc.clone(),
            file_in: report.file_in.clone(),
            file_out: report.file_out.clone(),
            plugin_id: result.plugin_id.clone(),
            plugin_name: result.name.clone(),
            success: result.success,
            duration_s: result.duration_s,
            auto_fixed: result.auto_fixed_count,
            errors: result.errors.clone(),
        }
    }
}

/// Outcome record for one input path, as returned by the batch driver.
///
/// Serializes with a `status` tag:
/// `{"status": "skipped", "file": ..., "reason": "unchanged"}` and so on;
/// a processed file carries the full report inline.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// The file changed and ran through the full pipeline.
    Processed {
        /// Canonical input path.
        file: String,
        /// The per-file report, flattened into the record.
        #[serde(flatten)]
        report: PipelineReport,
    },
    /// The file's content hash matched the cache; nothing ran.
    Skipped {
        /// Canonical input path.
        file: String,
        /// Why the file was skipped.
        reason: String,
    },
    /// No registered plugin applies to the file.
    NoPlugins {
        /// Canonical input path.
        file: String,
    },
    /// The per-file procedure failed; later files still ran.
    Failed {
        /// Input path as given.
        file: String,
        /// The failure, rendered.
        error: String,
    },
}

impl FileOutcome {
    /// Outcome for a processed file.
    #[must_use]
    pub fn processed(report: PipelineReport) -> Self {
        Self::Processed {
            file: report.file_in.clone(),
            report,
        }
    }

    /// Outcome for an unchanged, skipped file.
    #[must_use]
    pub fn skipped(file: &Path) -> Self {
        Self::Skipped {
            file: file.display().to_string(),
            reason: "unchanged".to_string(),
        }
    }

    /// Outcome for a file no plugin applies to.
    #[must_use]
    pub fn no_plugins(file: &Path) -> Self {
        Self::NoPlugins {
            file: file.display().to_string(),
        }
    }

    /// Outcome for a file whose processing failed.
    #[must_use]
    pub fn failed(file: &Path, error: String) -> Self {
        Self::Failed {
            file: file.display().to_string(),
            error,
        }
    }

    /// The `status` tag this outcome serializes with.
    #[must_use]
    pub fn status(&self) -> &'static str {
        match self {
            Self::Processed { .. } => "processed",
            Self::Skipped { .. } => "skipped",
            Self::NoPlugins { .. } => "no_plugins",
            Self::Failed { .. } => "failed",
        }
    }
}
