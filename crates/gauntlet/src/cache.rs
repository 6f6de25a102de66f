//! Persistent SHA-256 cache used for incremental validation.
//!
//! The cache stores one entry per validated file, keyed by the file's
//! absolute canonical path. Each entry records the last known SHA-256
//! digest, the timestamp of the validation, and whether that run produced
//! any errors.
//!
//! The cache is side-effect free until [`FileHashCache::save`] is invoked:
//! [`FileHashCache::has_changed`] only stages the computed digest so a
//! follow-up [`FileHashCache::mark_validated`] does not hash the same file
//! twice, and only `mark_validated` writes an entry and marks the cache
//! dirty.

use crate::error::{Error, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

/// Files are hashed in streaming reads of this many bytes, so memory use is
/// bounded regardless of file size.
const HASH_CHUNK_BYTES: usize = 1024 * 1024;

/// Cached state of a validated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Lowercase 64-hex SHA-256 digest of the file contents at
    /// `last_validated`.
    pub hash: String,
    /// RFC-3339 UTC timestamp of the validation run.
    pub last_validated: String,
    /// Whether that run produced any structured errors.
    #[serde(default)]
    pub had_errors: bool,
}

/// Tracks file hashes and validation metadata on disk.
///
/// Persistence is atomic: [`save`](Self::save) writes the whole mapping to a
/// temp file in the cache file's directory, fsyncs it, and renames it over
/// the target. A corrupt on-disk file is non-fatal and loads as an empty
/// cache with a warning.
pub struct FileHashCache {
    cache_file: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
    /// Digests computed by `has_changed` awaiting `mark_validated`.
    pending_hashes: HashMap<String, String>,
    dirty: bool,
}

impl FileHashCache {
    /// Opens the cache backed by `cache_file`, loading existing entries.
    ///
    /// A missing file yields an empty cache. A file that is not valid JSON,
    /// or whose top level is not an object, logs a warning and yields an
    /// empty cache. Individual entries of the wrong shape are dropped.
    pub async fn open(cache_file: impl Into<PathBuf>) -> Self {
        let cache_file = cache_file.into();
        let entries = load_entries(&cache_file).await;
        Self {
            cache_file,
            entries,
            pending_hashes: HashMap::new(),
            dirty: false,
        }
    }

    /// Path of the backing cache file.
    #[must_use]
    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no entries are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` when the file content differs from the cached digest.
    ///
    /// The computed hash is staged so that a follow-up
    /// [`mark_validated`](Self::mark_validated) does not hash the same file
    /// again. No cache entry is created or modified here.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the path cannot be canonicalized (including
    /// `NotFound` for missing files), or [`Error::NotAFile`] if it resolves
    /// to something other than a regular file.
    pub async fn has_changed(&mut self, path: &Path) -> Result<bool> {
        let canonical = canonicalize_regular_file(path).await?;
        let key = path_key(&canonical);
        let current_hash = hash_file(&canonical).await?;

        let changed = match self.entries.get(&key) {
            None => true,
            Some(entry) => entry.hash != current_hash,
        };
        self.pending_hashes.insert(key, current_hash);
        Ok(changed)
    }

    /// Updates (or creates) the cache entry after validation.
    ///
    /// Uses the digest staged by [`has_changed`](Self::has_changed) when
    /// present, otherwise recomputes it. Marks the cache dirty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be resolved or hashed.
    pub async fn mark_validated(&mut self, path: &Path, had_errors: bool) -> Result<()> {
        let canonical = canonicalize_regular_file(path).await?;
        let key = path_key(&canonical);
        let hash = match self.pending_hashes.remove(&key) {
            Some(staged) => staged,
            None => hash_file(&canonical).await?,
        };

        let last_validated = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        self.entries.insert(
            key,
            CacheEntry {
                hash,
                last_validated,
                had_errors,
            },
        );
        self.dirty = true;
        Ok(())
    }

    /// Returns the cached entry for `path`, if any.
    ///
    /// The path is canonicalized when possible; a path that no longer
    /// resolves is looked up as given.
    pub async fn get(&self, path: &Path) -> Option<&CacheEntry> {
        let key = match tokio::fs::canonicalize(path).await {
            Ok(canonical) => path_key(&canonical),
            Err(_) => path_key(path),
        };
        self.entries.get(&key)
    }

    /// Removes the cached entry for `path`, if it exists.
    pub async fn remove(&mut self, path: &Path) {
        let key = match tokio::fs::canonicalize(path).await {
            Ok(canonical) => path_key(&canonical),
            Err(_) => path_key(path),
        };
        if self.entries.remove(&key).is_some() {
            self.dirty = true;
        }
    }

    /// Persists the cache to disk using an atomic write.
    ///
    /// No-op when nothing changed since the last save. The on-disk format is
    /// a JSON object with sorted keys and 2-space indentation, so saves are
    /// byte-deterministic for a given mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp file cannot be written, fsynced, or
    /// renamed over the cache file.
    pub async fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.cache_file.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Temp file lives in the same directory as the target so the final
        // rename never crosses a filesystem boundary.
        let temp_path = temp_sibling(&self.cache_file);
        let payload = serde_json::to_string_pretty(&self.entries)?;

        let result = write_and_sync(&temp_path, payload.as_bytes()).await;
        if let Err(err) = result {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(err);
        }

        tokio::fs::rename(&temp_path, &self.cache_file).await?;
        self.dirty = false;
        Ok(())
    }
}

/// Builds the canonical string key for a path.
fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Derives the sibling temp path used for atomic saves.
fn temp_sibling(path: &Path) -> PathBuf {
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

async fn write_and_sync(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path).await?;
    tokio::io::AsyncWriteExt::write_all(&mut file, bytes).await?;
    file.sync_all().await?;
    Ok(())
}

/// Canonicalizes `path` and verifies it points at a regular file.
pub(crate) async fn canonicalize_regular_file(path: &Path) -> Result<PathBuf> {
    let canonical = tokio::fs::canonicalize(path).await?;
    let metadata = tokio::fs::metadata(&canonical).await?;
    if !metadata.is_file() {
        return Err(Error::NotAFile(canonical));
    }
    Ok(canonical)
}

/// Computes the lowercase hex SHA-256 digest of a file's contents.
async fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_BYTES];
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

async fn load_entries(cache_file: &Path) -> BTreeMap<String, CacheEntry> {
    let raw = match tokio::fs::read_to_string(cache_file).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(err) => {
            warn!(
                cache_file = %cache_file.display(),
                error = %err,
                "unable to read cache file; starting fresh"
            );
            return BTreeMap::new();
        }
    };

    let top_level: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(
                cache_file = %cache_file.display(),
                error = %err,
                "cache file is corrupted; starting fresh"
            );
            return BTreeMap::new();
        }
    };

    let serde_json::Value::Object(object) = top_level else {
        warn!(
            cache_file = %cache_file.display(),
            "cache file does not contain a JSON object; starting fresh"
        );
        return BTreeMap::new();
    };

    let mut entries = BTreeMap::new();
    for (key, value) in object {
        match serde_json::from_value::<CacheEntry>(value) {
            Ok(entry) => {
                entries.insert(key, entry);
            }
            Err(err) => {
                debug!(path = %key, error = %err, "dropping malformed cache entry");
            }
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, contents).await.unwrap();
        path
    }

    #[tokio::test]
    async fn unknown_file_has_changed() {
        let dir = TempDir::new().unwrap();
        let target = write_file(&dir, "example.txt", "alpha").await;
        let mut cache = FileHashCache::open(dir.path().join("cache.json")).await;

        assert!(cache.has_changed(&target).await.unwrap());
    }

    #[tokio::test]
    async fn mark_validated_then_unchanged_after_reload() {
        let dir = TempDir::new().unwrap();
        let cache_file = dir.path().join("cache.json");
        let target = write_file(&dir, "example.txt", "alpha").await;

        let mut cache = FileHashCache::open(&cache_file).await;
        assert!(cache.has_changed(&target).await.unwrap());
        cache.mark_validated(&target, false).await.unwrap();
        cache.save().await.unwrap();

        let mut reloaded = FileHashCache::open(&cache_file).await;
        assert!(!reloaded.has_changed(&target).await.unwrap());
    }

    #[tokio::test]
    async fn mutation_is_detected() {
        let dir = TempDir::new().unwrap();
        let cache_file = dir.path().join("cache.json");
        let target = write_file(&dir, "example.txt", "alpha").await;

        let mut cache = FileHashCache::open(&cache_file).await;
        cache.has_changed(&target).await.unwrap();
        cache.mark_validated(&target, false).await.unwrap();
        assert!(!cache.has_changed(&target).await.unwrap());

        tokio::fs::write(&target, "beta").await.unwrap();
        assert!(cache.has_changed(&target).await.unwrap());
    }

    #[tokio::test]
    async fn has_changed_does_not_mutate_entries() {
        let dir = TempDir::new().unwrap();
        let cache_file = dir.path().join("cache.json");
        let target = write_file(&dir, "example.txt", "alpha").await;

        let mut cache = FileHashCache::open(&cache_file).await;
        cache.has_changed(&target).await.unwrap();
        assert!(cache.is_empty());
        assert!(cache.get(&target).await.is_none());

        // Not dirty either: save must leave no file behind.
        cache.save().await.unwrap();
        assert!(!cache_file.exists());
    }

    #[tokio::test]
    async fn had_errors_survives_a_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache_file = dir.path().join("cache.json");
        let target = write_file(&dir, "example.txt", "alpha").await;

        let mut cache = FileHashCache::open(&cache_file).await;
        cache.mark_validated(&target, true).await.unwrap();
        cache.save().await.unwrap();

        let reloaded = FileHashCache::open(&cache_file).await;
        let entry = reloaded.get(&target).await.unwrap();
        assert!(entry.had_errors);
        assert_eq!(entry.hash.len(), 64);
    }

    #[tokio::test]
    async fn save_is_deterministic_and_sorted() {
        let dir = TempDir::new().unwrap();
        let cache_file = dir.path().join("cache.json");
        let first = write_file(&dir, "a.txt", "one").await;
        let second = write_file(&dir, "b.txt", "two").await;

        let mut cache = FileHashCache::open(&cache_file).await;
        // Insertion order should not matter.
        cache.mark_validated(&second, false).await.unwrap();
        cache.mark_validated(&first, false).await.unwrap();
        cache.save().await.unwrap();

        let raw = tokio::fs::read_to_string(&cache_file).await.unwrap();
        let a_pos = raw.find("a.txt").unwrap();
        let b_pos = raw.find("b.txt").unwrap();
        assert!(a_pos < b_pos);
        assert!(raw.contains("  \""));
    }

    #[tokio::test]
    async fn corrupt_cache_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let cache_file = dir.path().join("cache.json");
        tokio::fs::write(&cache_file, "{not json at all")
            .await
            .unwrap();

        let cache = FileHashCache::open(&cache_file).await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn malformed_entries_are_dropped_individually() {
        let dir = TempDir::new().unwrap();
        let cache_file = dir.path().join("cache.json");
        let payload = serde_json::json!({
            "/good": {
                "hash": "ab".repeat(32),
                "last_validated": "2025-01-01T00:00:00Z",
                "had_errors": false
            },
            "/bad-shape": { "hash": 42 },
            "/not-an-object": "nope"
        });
        tokio::fs::write(&cache_file, payload.to_string())
            .await
            .unwrap();

        let cache = FileHashCache::open(&cache_file).await;
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn leftover_temp_file_does_not_disturb_the_cache() {
        let dir = TempDir::new().unwrap();
        let cache_file = dir.path().join("cache.json");
        let target = write_file(&dir, "example.txt", "alpha").await;

        let mut cache = FileHashCache::open(&cache_file).await;
        cache.mark_validated(&target, false).await.unwrap();
        cache.save().await.unwrap();
        let saved = tokio::fs::read_to_string(&cache_file).await.unwrap();

        // Simulate a save interrupted after the temp write but before the
        // rename: the prior cache file must remain intact and parseable.
        tokio::fs::write(dir.path().join("cache.json.tmp"), "garbage")
            .await
            .unwrap();

        let reloaded = FileHashCache::open(&cache_file).await;
        assert_eq!(reloaded.len(), 1);
        assert_eq!(
            tokio::fs::read_to_string(&cache_file).await.unwrap(),
            saved
        );
    }

    #[tokio::test]
    async fn remove_deletes_the_entry() {
        let dir = TempDir::new().unwrap();
        let cache_file = dir.path().join("cache.json");
        let target = write_file(&dir, "example.txt", "alpha").await;

        let mut cache = FileHashCache::open(&cache_file).await;
        cache.mark_validated(&target, false).await.unwrap();
        assert_eq!(cache.len(), 1);

        cache.remove(&target).await;
        assert!(cache.is_empty());
        assert!(cache.has_changed(&target).await.unwrap());
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut cache = FileHashCache::open(dir.path().join("cache.json")).await;

        let missing = dir.path().join("missing.txt");
        let err = cache.has_changed(&missing).await.unwrap_err();
        match err {
            Error::Io(io_err) => assert_eq!(io_err.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected IO NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn directory_is_not_a_regular_file() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        tokio::fs::create_dir(&sub).await.unwrap();
        let mut cache = FileHashCache::open(dir.path().join("cache.json")).await;

        let err = cache.has_changed(&sub).await.unwrap_err();
        assert!(matches!(err, Error::NotAFile(_)));
    }
}
