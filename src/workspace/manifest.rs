//! Workspace manifest files
//!
//! A manifest describes the modules of an imported workspace:
//!
//! ```yaml
//! workspace_root: .
//! modules:
//!   - name: lib-core
//!     location: lib-core
//!     targets: ["//lib-core:lib"]
//!     source_roots:
//!       - path: .
//!         include: ["src/**/*.java"]
//!         exclude: ["src/**/generated/**"]
//! ```
//!
//! Relative paths resolve against the manifest's directory, module locations
//! against the workspace root and source roots against their module.

use super::WorkspaceIndex;
use crate::model::{ModuleSourceSet, SourceRoot};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Failed to read workspace manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse workspace manifest {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Module {0} is declared more than once")]
    DuplicateModule(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceManifest {
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,
    #[serde(default)]
    pub modules: Vec<ModuleManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub name: String,
    pub location: PathBuf,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub source_roots: Vec<SourceRootManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRootManifest {
    pub path: PathBuf,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl WorkspaceManifest {
    /// Loads a manifest, choosing JSON or YAML by file extension
    pub fn load(path: &Path) -> Result<Self, WorkspaceError> {
        let content = std::fs::read_to_string(path).map_err(|source| WorkspaceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let parsed = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| WorkspaceError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Workspace root with relative values resolved against `base_dir`
    pub fn resolved_root(&self, base_dir: &Path) -> PathBuf {
        match &self.workspace_root {
            Some(root) => absolutize(base_dir, root),
            None => base_dir.to_path_buf(),
        }
    }

    pub fn into_index(self, base_dir: &Path) -> Result<WorkspaceIndex, WorkspaceError> {
        let root = self.resolved_root(base_dir);
        let mut seen = HashSet::new();
        let index = WorkspaceIndex::new();

        for module in self.modules {
            if !seen.insert(module.name.clone()) {
                return Err(WorkspaceError::DuplicateModule(module.name));
            }

            let location = absolutize(&root, &module.location);
            let source_roots = module
                .source_roots
                .into_iter()
                .map(|sr| SourceRoot {
                    path: absolutize(&location, &sr.path),
                    include: sr.include,
                    exclude: sr.exclude,
                })
                .collect();

            index.add_module(ModuleSourceSet {
                name: module.name,
                location,
                source_roots,
                targets: module.targets,
            });
        }

        Ok(index)
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let joined = base.join(path);
    // "." segments would break prefix containment checks later on
    joined
        .components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::ModuleIndex;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
workspace_root: ws
modules:
  - name: lib-core
    location: lib-core
    targets: ["//lib-core:lib"]
    source_roots:
      - path: .
        include: ["src/**/*.java"]
  - name: app
    location: /abs/app
    source_roots:
      - path: src/main/java
"#;

    #[test]
    fn test_load_yaml_and_resolve_paths() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("workspace.yaml");
        std::fs::write(&path, MANIFEST).unwrap();

        let manifest = WorkspaceManifest::load(&path).unwrap();
        let index = manifest.into_index(temp.path()).unwrap();

        let core = index.module("lib-core").unwrap();
        assert_eq!(core.location, temp.path().join("ws/lib-core"));
        assert_eq!(core.source_roots[0].path, temp.path().join("ws/lib-core"));
        assert_eq!(core.source_roots[0].include, vec!["src/**/*.java"]);
        assert_eq!(core.targets, vec!["//lib-core:lib"]);

        let app = index.module("app").unwrap();
        assert_eq!(app.location, PathBuf::from("/abs/app"));
        assert_eq!(
            app.source_roots[0].path,
            PathBuf::from("/abs/app/src/main/java")
        );
    }

    #[test]
    fn test_load_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("workspace.json");
        std::fs::write(
            &path,
            r#"{"modules": [{"name": "app", "location": "app", "targets": ["//app:main"]}]}"#,
        )
        .unwrap();

        let index = WorkspaceManifest::load(&path)
            .unwrap()
            .into_index(temp.path())
            .unwrap();
        assert_eq!(index.targets_for_module("app"), vec!["//app:main"]);
    }

    #[test]
    fn test_duplicate_modules_rejected() {
        let manifest: WorkspaceManifest = serde_yaml::from_str(
            "modules:\n  - {name: app, location: a}\n  - {name: app, location: b}\n",
        )
        .unwrap();

        assert!(matches!(
            manifest.into_index(Path::new("/ws")),
            Err(WorkspaceError::DuplicateModule(name)) if name == "app"
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = WorkspaceManifest::load(Path::new("/nonexistent/workspace.yaml")).unwrap_err();
        assert!(matches!(err, WorkspaceError::Io { .. }));
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("workspace.yaml");
        std::fs::write(&path, "modules: [unclosed").unwrap();

        assert!(matches!(
            WorkspaceManifest::load(&path),
            Err(WorkspaceError::Parse { .. })
        ));
    }
}
