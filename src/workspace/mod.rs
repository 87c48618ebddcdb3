//! Host workspace model
//!
//! The resolver only needs a read-only view of the modules already imported into
//! the workspace, plus a way to record module-to-module references. Both go
//! through [`ModuleIndex`]; [`WorkspaceIndex`] is the in-memory implementation
//! used by the CLI and by tests.

mod manifest;

use crate::model::ModuleSourceSet;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

pub use manifest::{ModuleManifest, SourceRootManifest, WorkspaceError, WorkspaceManifest};

/// Name prefix of the synthetic module holding workspace-scoped files
pub const WORKSPACE_MODULE_BASENAME: &str = "Bazel Workspace";

pub fn is_workspace_module(name: &str) -> bool {
    name.starts_with(WORKSPACE_MODULE_BASENAME)
}

pub trait ModuleIndex: Send + Sync {
    /// Snapshot of all known modules, in workspace order
    fn modules(&self) -> Vec<ModuleSourceSet>;

    fn module(&self, name: &str) -> Option<ModuleSourceSet>;

    /// Build targets a module was imported from
    fn targets_for_module(&self, name: &str) -> Vec<String> {
        self.module(name).map(|m| m.targets).unwrap_or_default()
    }

    /// Records that `from` references `to`; returns true when the reference is new
    fn ensure_reference(&self, from: &str, to: &str) -> bool;

    fn references(&self, name: &str) -> Vec<String>;
}

#[derive(Default)]
pub struct WorkspaceIndex {
    modules: RwLock<Vec<ModuleSourceSet>>,
    references: RwLock<HashMap<String, Vec<String>>>,
}

impl WorkspaceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_modules(modules: impl IntoIterator<Item = ModuleSourceSet>) -> Self {
        let index = Self::new();
        for module in modules {
            index.add_module(module);
        }
        index
    }

    /// Adds or replaces a module; bulk import calls this once per imported module
    pub fn add_module(&self, module: ModuleSourceSet) {
        if let Ok(mut modules) = self.modules.write() {
            match modules.iter_mut().find(|m| m.name == module.name) {
                Some(existing) => *existing = module,
                None => modules.push(module),
            }
        }
    }

    pub fn remove_module(&self, name: &str) -> bool {
        let removed = self
            .modules
            .write()
            .map(|mut modules| {
                let before = modules.len();
                modules.retain(|m| m.name != name);
                modules.len() != before
            })
            .unwrap_or(false);

        if removed {
            if let Ok(mut references) = self.references.write() {
                references.remove(name);
                for targets in references.values_mut() {
                    targets.retain(|t| t != name);
                }
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.modules.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ModuleIndex for WorkspaceIndex {
    fn modules(&self) -> Vec<ModuleSourceSet> {
        self.modules.read().map(|m| m.clone()).unwrap_or_default()
    }

    fn module(&self, name: &str) -> Option<ModuleSourceSet> {
        self.modules
            .read()
            .ok()?
            .iter()
            .find(|m| m.name == name)
            .cloned()
    }

    fn ensure_reference(&self, from: &str, to: &str) -> bool {
        let Ok(mut references) = self.references.write() else {
            return false;
        };
        let existing = references.entry(from.to_string()).or_default();
        if existing.iter().any(|r| r == to) {
            return false;
        }
        existing.push(to.to_string());
        debug!(from = %from, to = %to, "Added module reference");
        true
    }

    fn references(&self, name: &str) -> Vec<String> {
        self.references
            .read()
            .ok()
            .and_then(|r| r.get(name).cloned())
            .unwrap_or_default()
    }
}
