//! Append-only JSONL log with size-bounded, tail-preserving rotation.
//!
//! [`RotatingLog`] appends one JSON record per line and, whenever the file
//! grows past its byte budget, rewrites it with the longest suffix of
//! complete lines that still fits. Rotation keeps the newest records; the
//! oldest complete lines (and any partial leading line that falls outside
//! the retained window) are discarded.
//!
//! # Atomicity
//!
//! The rotated content is written to a sibling temp file, flushed, fsynced,
//! and renamed over the log, so an observer sees either the old file or the
//! fully rotated one. Append + rotate is one logical operation guarded by a
//! process-local async mutex; cross-process concurrency is not supported.

use crate::writer::JsonlWriter;
use crate::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio::sync::Mutex;
use tracing::warn;

/// Default rotation budget in bytes.
pub const DEFAULT_MAX_BYTES: u64 = 76_800;

/// Chunk size for the backwards tail scan during rotation.
const TAIL_CHUNK: u64 = 8192;

/// Append-only JSONL log file with size-based rotation.
///
/// # Examples
///
/// ```no_run
/// use gauntlet_jsonl::RotatingLog;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let log = RotatingLog::with_max_bytes("events.jsonl", 120);
/// log.append(&serde_json::json!({ "index": 0 })).await?;
/// # Ok(())
/// # }
/// ```
pub struct RotatingLog {
    path: PathBuf,
    max_bytes: u64,
    /// Serializes append + rotate so concurrent callers observe intact lines.
    lock: Mutex<()>,
}

impl RotatingLog {
    /// Creates a log at `path` with the default byte budget.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_max_bytes(path, DEFAULT_MAX_BYTES)
    }

    /// Creates a log at `path` that rotates once its size exceeds `max_bytes`.
    #[must_use]
    pub fn with_max_bytes(path: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            path: path.into(),
            max_bytes,
            lock: Mutex::new(()),
        }
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rotation budget in bytes.
    #[must_use]
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Appends `record` as a single JSON line, rotating afterwards if the
    /// file has outgrown the budget.
    ///
    /// Parent directories are created if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the record fails to serialize or an I/O error
    /// occurs while appending or rotating.
    pub async fn append<T: Serialize>(&self, record: &T) -> Result<()> {
        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let mut writer = JsonlWriter::new(file);
        writer.write(record).await?;
        writer.flush().await?;
        drop(writer);

        self.rotate_if_needed().await
    }

    /// Rewrites the log with the newest complete lines when it exceeds the
    /// budget. Must be called with the lock held.
    async fn rotate_if_needed(&self) -> Result<()> {
        let size = tokio::fs::metadata(&self.path).await?.len();
        if size <= self.max_bytes {
            return Ok(());
        }

        let kept = self.tail_lines(size).await?;

        let temp_path = make_temp_path(&self.path);
        let file = File::create(&temp_path).await?;
        let mut writer = JsonlWriter::new(file);
        for line in &kept {
            writer.write_raw_line(line).await?;
        }
        writer.flush().await?;
        writer.into_inner().into_inner().sync_all().await?;

        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    /// Returns the longest suffix of complete lines whose encoded length
    /// (including terminating newlines) fits within the budget.
    ///
    /// Reads the file backwards in fixed-size chunks rather than loading it
    /// whole; a partial leading line in the scanned window is discarded. If
    /// the newest record alone exceeds the budget it is kept verbatim, with
    /// a warning.
    async fn tail_lines(&self, size: u64) -> Result<Vec<String>> {
        let mut file = File::open(&self.path).await?;
        let mut buffer: Vec<u8> = Vec::new();
        let mut pos = size;
        // Twice the budget is enough slack to always contain the retained
        // suffix plus the partial line preceding it.
        let target = self.max_bytes.saturating_mul(2);

        while pos > 0 && (buffer.len() as u64) < target {
            let step = TAIL_CHUNK.min(pos);
            pos -= step;
            file.seek(SeekFrom::Start(pos)).await?;
            let mut chunk = vec![0u8; usize::try_from(step).unwrap_or(usize::MAX)];
            file.read_exact(&mut chunk).await?;
            chunk.extend_from_slice(&buffer);
            buffer = chunk;
        }

        let mut window: &[u8] = &buffer;
        if pos > 0 {
            // The scan stopped mid-file, so the window may start inside a
            // record. Everything before the first newline is that partial
            // line.
            window = match window.iter().position(|byte| *byte == b'\n') {
                Some(index) => &window[index + 1..],
                None => &[],
            };
        }

        let text = String::from_utf8_lossy(window);
        let mut kept: Vec<String> = Vec::new();
        let mut total: u64 = 0;
        for line in text.lines().rev() {
            let line_size = line.len() as u64 + 1;
            if total + line_size > self.max_bytes {
                if kept.is_empty() {
                    warn!(
                        bytes = line_size,
                        max_bytes = self.max_bytes,
                        path = %self.path.display(),
                        "single record exceeds the rotation budget; keeping it verbatim"
                    );
                    kept.push(line.to_string());
                }
                break;
            }
            kept.push(line.to_string());
            total += line_size;
        }
        kept.reverse();
        Ok(kept)
    }
}

/// Derives the sibling temp path used for atomic rotation.
///
/// `events.jsonl` becomes `events.jsonl.tmp`; a path without an extension
/// gets a plain `.tmp`.
fn make_temp_path(path: &Path) -> PathBuf {
    let mut temp_path = path.to_path_buf();
    let new_extension = match path.extension() {
        Some(ext) => {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".tmp");
            new_ext
        }
        None => std::ffi::OsString::from("tmp"),
    };
    temp_path.set_extension(new_extension);
    temp_path
}
