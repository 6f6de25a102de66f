//! Plugin registration and dependency-ordered selection.
//!
//! The manager owns the registered plugins and answers one question per
//! file: which plugins apply, and in what order? The order is a topological
//! sort of the dependency graph induced by the applicable plugins, with
//! ties broken by lexicographic plugin id so independent runs produce
//! byte-identical sequences.
//!
//! # Graph Representation
//!
//! The dependency graph uses petgraph's `DiGraph` with edges directed from
//! **dependency to dependent**: an edge `A -> B` means A must run before B
//! (B's `requires` lists A). Dependencies on plugins that are not
//! applicable to the current file are dropped, not errors; a cycle within
//! the applicable set is a hard [`PluginError`].

mod discovery;

use crate::error::{PluginError, Result};
use crate::plugin::{run_with_barrier, PluginResult, PluginState, ValidatorPlugin};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub use discovery::DiscoveryOutcome;

/// Registers plugins and resolves per-file execution order.
///
/// The plugin store is a `BTreeMap` keyed by plugin id, so iteration is
/// deterministic regardless of registration order.
pub struct PluginManager {
    plugins: BTreeMap<String, Box<dyn ValidatorPlugin>>,
}

impl PluginManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            plugins: BTreeMap::new(),
        }
    }

    /// Creates a manager from an iterator of plugins.
    ///
    /// # Errors
    ///
    /// Returns an error if any plugin has an empty id or a duplicate id.
    pub fn with_plugins<I>(plugins: I) -> Result<Self>
    where
        I: IntoIterator<Item = Box<dyn ValidatorPlugin>>,
    {
        let mut manager = Self::new();
        for plugin in plugins {
            manager.register(plugin)?;
        }
        Ok(manager)
    }

    /// Registers a plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::EmptyId`] for a plugin without an id and
    /// [`PluginError::AlreadyRegistered`] when the id is taken.
    pub fn register(&mut self, plugin: Box<dyn ValidatorPlugin>) -> Result<()> {
        let id = plugin.plugin_id().to_string();
        if id.is_empty() {
            return Err(PluginError::EmptyId.into());
        }
        if self.plugins.contains_key(&id) {
            return Err(PluginError::AlreadyRegistered(id).into());
        }
        self.plugins.insert(id, plugin);
        Ok(())
    }

    /// Resolves a plugin id from the store; used when materializing a
    /// computed order back into plugin references.
    fn get(&self, id: &str) -> Result<&dyn ValidatorPlugin> {
        self.plugins
            .get(id)
            .map(AsRef::as_ref)
            .ok_or_else(|| PluginError::UnknownPlugin(id.to_string()).into())
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` when no plugins are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Registered plugin ids in deterministic order.
    #[must_use]
    pub fn plugin_ids(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    /// Plugins whose `can_process` accepts `path`.
    #[must_use]
    pub fn applicable_plugins(&self, path: &Path) -> Vec<&dyn ValidatorPlugin> {
        self.plugins
            .values()
            .map(AsRef::as_ref)
            .filter(|plugin| plugin.can_process(path))
            .collect()
    }

    /// Applicable plugins for `path` in dependency order.
    ///
    /// Builds the subgraph induced by the applicable plugins (dependencies
    /// on non-applicable plugins are dropped) and returns a topological
    /// order with lexicographic tie-break.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::CycleDetected`] when the induced graph is
    /// cyclic.
    pub fn ordered_plugins(&self, path: &Path) -> Result<Vec<&dyn ValidatorPlugin>> {
        let applicable = self.applicable_plugins(path);

        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut node_map: BTreeMap<&str, NodeIndex> = BTreeMap::new();
        for plugin in &applicable {
            let id = plugin.plugin_id();
            node_map.insert(id, graph.add_node(id));
        }

        for plugin in &applicable {
            let Some(&dependent) = node_map.get(plugin.plugin_id()) else {
                continue;
            };
            for dependency in plugin.requires() {
                // Edges only exist within the applicable set; a dependency
                // on a non-applicable plugin is dropped.
                if let Some(&required) = node_map.get(dependency.as_str()) {
                    graph.add_edge(required, dependent, ());
                }
            }
        }

        // Kahn's algorithm over a BTreeSet ready-set: the smallest id among
        // the currently unblocked plugins always runs next, which makes the
        // order deterministic across runs.
        let mut indegree: BTreeMap<&str, usize> = node_map
            .iter()
            .map(|(id, node)| {
                (
                    *id,
                    graph.neighbors_directed(*node, Direction::Incoming).count(),
                )
            })
            .collect();
        let mut ready: BTreeSet<&str> = indegree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut order: Vec<&str> = Vec::with_capacity(node_map.len());
        while let Some(id) = ready.pop_first() {
            order.push(id);
            for neighbor in graph.neighbors_directed(node_map[id], Direction::Outgoing) {
                let neighbor_id = graph[neighbor];
                let degree = indegree
                    .get_mut(neighbor_id)
                    .expect("neighbor missing from indegree map");
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(neighbor_id);
                }
            }
        }

        if order.len() != node_map.len() {
            return Err(PluginError::CycleDetected.into());
        }

        order.into_iter().map(|id| self.get(id)).collect()
    }

    /// Runs the ordered applicable plugins for `path` sequentially.
    ///
    /// Plugin faults do not short-circuit: each is captured as a failed
    /// [`PluginResult`] by the execution barrier and later plugins still
    /// run, observing mutations from earlier ones.
    ///
    /// # Errors
    ///
    /// Only manager-level errors (a dependency cycle) abort the pass.
    pub async fn execute(&self, path: &Path, state: &mut PluginState) -> Result<Vec<PluginResult>> {
        let ordered = self.ordered_plugins(path)?;
        let mut results = Vec::with_capacity(ordered.len());
        for plugin in ordered {
            results.push(run_with_barrier(plugin, path, state).await);
        }
        Ok(results)
    }

    /// Discovers manifest-driven plugins under `plugin_dir` and registers
    /// them.
    ///
    /// Directories without a readable manifest, and manifests that do not
    /// parse, are skipped with a warning; plugins are instantiated in
    /// dependency order through `registry`.
    ///
    /// # Errors
    ///
    /// Returns a `ManifestError` for semantic manifest problems (duplicate
    /// names, unknown dependencies, cycles) and a `PluginLoadError` when a
    /// manifest's entrypoint cannot be resolved or instantiated.
    pub async fn discover(
        &mut self,
        plugin_dir: &Path,
        registry: &crate::plugin::registry::PluginRegistry,
    ) -> Result<DiscoveryOutcome> {
        discovery::discover_into(self, plugin_dir, registry).await
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}
