//! Data model shared by the resolver components
//!
//! Values here are produced either by the build tool (dependency metadata), by the
//! host workspace (module source sets) or by the assembler (classpath entries).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// A primary archive plus its optional companion sources archive.
///
/// Both references are build-tool relative, e.g. `external/foo/foo.jar` or
/// `bazel-out/k8-fastbuild/bin/lib/liblib.jar`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArchivePair {
    #[serde(default, alias = "jar")]
    pub primary: Option<String>,
    #[serde(default, alias = "source_jar")]
    pub sources: Option<String>,
}

impl ArchivePair {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: Some(primary.into()),
            sources: None,
        }
    }

    pub fn with_sources(mut self, sources: impl Into<String>) -> Self {
        self.sources = Some(sources.into());
        self
    }
}

/// Build-tool metadata for one upstream dependency of the requested target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyUnit {
    pub label: String,
    /// Declared source files, in the order the build tool reported them
    #[serde(default)]
    pub sources: Vec<String>,
    /// Archives produced as build outputs of this unit
    #[serde(default)]
    pub generated_jars: Vec<ArchivePair>,
    /// Archives available as already-built library outputs
    #[serde(default)]
    pub jars: Vec<ArchivePair>,
}

impl DependencyUnit {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    pub fn with_generated_jar(mut self, pair: ArchivePair) -> Self {
        self.generated_jars.push(pair);
        self
    }

    pub fn with_jar(mut self, pair: ArchivePair) -> Self {
        self.jars.push(pair);
        self
    }

    /// Generated archives first, then library archives
    pub fn archives(&self) -> impl Iterator<Item = &ArchivePair> {
        self.generated_jars.iter().chain(self.jars.iter())
    }
}

/// One resolved classpath entry handed to the host project model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ClasspathEntry {
    /// Reference to another in-workspace module by its full workspace path
    Module { path: String },
    /// Prebuilt archive on disk
    Library {
        archive: PathBuf,
        #[serde(skip_serializing_if = "Option::is_none")]
        sources: Option<PathBuf>,
    },
}

impl ClasspathEntry {
    pub fn module(path: impl Into<String>) -> Self {
        ClasspathEntry::Module { path: path.into() }
    }

    pub fn library(archive: PathBuf, sources: Option<PathBuf>) -> Self {
        ClasspathEntry::Library { archive, sources }
    }
}

/// Ordered, module-deduplicated entry set produced by one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredClasspath")]
pub struct ResolvedClasspath {
    entries: Vec<ClasspathEntry>,
    #[serde(skip)]
    module_paths: HashSet<String>,
    pub resolved_at: DateTime<Utc>,
}

impl Default for ResolvedClasspath {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolvedClasspath {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            module_paths: HashSet::new(),
            resolved_at: Utc::now(),
        }
    }

    /// Appends a module reference; returns false if that module path is already present.
    pub fn push_module(&mut self, path: &str) -> bool {
        if !self.module_paths.insert(path.to_string()) {
            return false;
        }
        self.entries.push(ClasspathEntry::module(path));
        true
    }

    pub fn push_library(&mut self, archive: PathBuf, sources: Option<PathBuf>) {
        self.entries.push(ClasspathEntry::library(archive, sources));
    }

    pub fn contains_module(&self, path: &str) -> bool {
        self.module_paths.contains(path)
    }

    pub fn entries(&self) -> &[ClasspathEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compares entry contents only, ignoring when each pass ran
    pub fn same_entries(&self, other: &ResolvedClasspath) -> bool {
        self.entries == other.entries
    }
}

/// Serialized form; the module index is rebuilt on load
#[derive(Deserialize)]
struct StoredClasspath {
    entries: Vec<ClasspathEntry>,
    resolved_at: DateTime<Utc>,
}

impl From<StoredClasspath> for ResolvedClasspath {
    fn from(stored: StoredClasspath) -> Self {
        let mut classpath = ResolvedClasspath {
            resolved_at: stored.resolved_at,
            ..ResolvedClasspath::new()
        };
        for entry in stored.entries {
            match entry {
                ClasspathEntry::Module { path } => {
                    classpath.push_module(&path);
                }
                ClasspathEntry::Library { archive, sources } => {
                    classpath.push_library(archive, sources)
                }
            }
        }
        classpath
    }
}

impl IntoIterator for ResolvedClasspath {
    type Item = ClasspathEntry;
    type IntoIter = std::vec::IntoIter<ClasspathEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// One declared source root of a module, with Eclipse-style include/exclude globs
/// relative to the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRoot {
    pub path: PathBuf,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl SourceRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include.push(pattern.into());
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }
}

/// Snapshot of one known workspace module as seen by the ownership resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSourceSet {
    pub name: String,
    /// Absolute location of the module on disk
    pub location: PathBuf,
    #[serde(default)]
    pub source_roots: Vec<SourceRoot>,
    /// Build targets this module was imported from
    #[serde(default)]
    pub targets: Vec<String>,
}

impl ModuleSourceSet {
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            source_roots: Vec::new(),
            targets: Vec::new(),
        }
    }

    pub fn with_source_root(mut self, root: SourceRoot) -> Self {
        self.source_roots.push(root);
        self
    }

    pub fn with_target(mut self, label: impl Into<String>) -> Self {
        self.targets.push(label.into());
        self
    }

    /// Full workspace path used for module references, e.g. `/lib-core`
    pub fn full_path(&self) -> String {
        format!("/{}", self.name)
    }
}

/// A problem reported by the build tool's check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemMarker {
    pub resource: String,
    pub line: Option<u32>,
    pub description: String,
}

/// The two roots under which build-tool relative archive paths are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRoots {
    /// Root for `external/...` third-party outputs
    pub output_base: PathBuf,
    /// Root for first-party build outputs
    pub exec_root: PathBuf,
}

impl OutputRoots {
    pub fn new(output_base: impl Into<PathBuf>, exec_root: impl Into<PathBuf>) -> Self {
        Self {
            output_base: output_base.into(),
            exec_root: exec_root.into(),
        }
    }
}
