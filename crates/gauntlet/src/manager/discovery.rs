//! Manifest discovery and dependency-ordered plugin loading.
//!
//! Discovery scans the plugin directory: each subdirectory is expected to
//! carry a `manifest.json`. Directories without one, and manifests that do
//! not parse, are skipped with a warning. Semantic problems across the
//! manifest set — duplicate names, dependencies nobody provides, cycles —
//! are hard [`ManifestError`]s: the manager refuses to proceed until the
//! manifest set is corrected.
//!
//! Plugins are instantiated in dependency order, each through the
//! constructor registry; an entrypoint the registry does not know is a
//! [`PluginLoadError`](crate::error::PluginLoadError).

use crate::error::{ManifestError, Result};
use crate::manager::PluginManager;
use crate::manifest::{PluginManifest, MANIFEST_FILE_NAME};
use crate::plugin::registry::PluginRegistry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{info, warn};

/// Summary of one discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    /// Plugin ids registered by this pass, in load order.
    pub loaded: Vec<String>,
    /// Number of directories skipped for missing or malformed manifests.
    pub skipped: usize,
}

pub(super) async fn discover_into(
    manager: &mut PluginManager,
    plugin_dir: &Path,
    registry: &PluginRegistry,
) -> Result<DiscoveryOutcome> {
    let mut outcome = DiscoveryOutcome {
        loaded: Vec::new(),
        skipped: 0,
    };

    let mut subdirs = Vec::new();
    let mut entries = tokio::fs::read_dir(plugin_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            subdirs.push(entry.path());
        }
    }
    // Deterministic discovery order regardless of readdir order.
    subdirs.sort();

    let mut manifests: BTreeMap<String, PluginManifest> = BTreeMap::new();
    for dir in &subdirs {
        let manifest_path = dir.join(MANIFEST_FILE_NAME);
        let raw = match tokio::fs::read_to_string(&manifest_path).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    plugin_dir = %dir.display(),
                    error = %err,
                    "skipping plugin directory without readable manifest"
                );
                outcome.skipped += 1;
                continue;
            }
        };

        let manifest: PluginManifest = match serde_json::from_str(&raw) {
            Ok(manifest) => manifest,
            Err(err) => {
                warn!(
                    manifest = %manifest_path.display(),
                    error = %err,
                    "skipping malformed manifest"
                );
                outcome.skipped += 1;
                continue;
            }
        };

        manifest.validate(&manifest_path)?;

        if manifests.contains_key(&manifest.name) {
            return Err(ManifestError::DuplicateName(manifest.name).into());
        }
        manifests.insert(manifest.name.clone(), manifest);
    }

    // Names are checked above; ids can still collide when manifests set
    // plugin_id explicitly.
    let mut seen_ids = BTreeSet::new();
    for manifest in manifests.values() {
        if !seen_ids.insert(manifest.plugin_id()) {
            return Err(ManifestError::DuplicatePluginId(manifest.plugin_id().to_string()).into());
        }
    }

    // Dependencies may reference any discovered manifest or a plugin that
    // is already registered (e.g. one supplied on the command line).
    let known_ids: BTreeSet<String> = manifests
        .values()
        .map(|manifest| manifest.plugin_id().to_string())
        .chain(manager.plugin_ids().iter().map(|id| (*id).to_string()))
        .collect();

    for manifest in manifests.values() {
        for dependency in &manifest.dependencies {
            if !known_ids.contains(dependency) {
                return Err(ManifestError::UnknownDependency {
                    plugin: manifest.name.clone(),
                    dependency: dependency.clone(),
                }
                .into());
            }
        }
    }

    for manifest in order_manifests(&manifests)? {
        let plugin = registry.construct(manifest)?;
        let id = plugin.plugin_id().to_string();
        manager.register(plugin)?;
        info!(plugin = %id, "loaded manifest-driven plugin");
        outcome.loaded.push(id);
    }

    Ok(outcome)
}

/// Orders manifests so every dependency loads before its dependents.
///
/// Dependencies on plugins outside the manifest set (already registered in
/// the manager) impose no ordering constraint here.
fn order_manifests(
    manifests: &BTreeMap<String, PluginManifest>,
) -> std::result::Result<Vec<&PluginManifest>, ManifestError> {
    let by_id: BTreeMap<&str, &PluginManifest> = manifests
        .values()
        .map(|manifest| (manifest.plugin_id(), manifest))
        .collect();

    let mut indegree: BTreeMap<&str, usize> = by_id.keys().map(|id| (*id, 0)).collect();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (&id, manifest) in &by_id {
        for dependency in &manifest.dependencies {
            if by_id.contains_key(dependency.as_str()) {
                *indegree.get_mut(id).expect("id missing from indegree") += 1;
                dependents.entry(dependency.as_str()).or_default().push(id);
            }
        }
    }

    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(by_id.len());
    while let Some(id) = ready.pop_first() {
        order.push(by_id[id]);
        for dependent in dependents.get(id).into_iter().flatten().copied() {
            let degree = indegree
                .get_mut(dependent)
                .expect("dependent missing from indegree");
            *degree -= 1;
            if *degree == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() != by_id.len() {
        return Err(ManifestError::CycleDetected);
    }
    Ok(order)
}
