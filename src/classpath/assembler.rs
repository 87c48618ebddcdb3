//! Classpath assembly
//!
//! For every dependency unit the build tool reports for a module's targets:
//! - sources owned by another workspace module become a module reference (and a
//!   module-to-module reference is recorded),
//! - sources owned by the module itself are skipped,
//! - anything else is satisfied by its archives.
//!
//! An archive that cannot be found asks the build tool to drop its memoised
//! metadata for the module's targets, so the next pass sees fresher data.

use super::locator::ArtifactLocator;
use super::ownership::SourceOwnershipResolver;
use crate::build_tool::BuildTool;
use crate::config::EXTERNAL_MARKER;
use crate::error::ResolveError;
use crate::fs::FileSystem;
use crate::model::{ArchivePair, DependencyUnit, ResolvedClasspath};
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use crate::workspace::ModuleIndex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const OPERATION: &str = "assemble_classpath";

pub struct ClasspathAssembler {
    build_tool: Arc<dyn BuildTool>,
    modules: Arc<dyn ModuleIndex>,
    fs: Arc<dyn FileSystem>,
    progress: Arc<dyn ProgressHandler>,
    external_marker: String,
}

/// Per-pass state threaded through unit processing
struct Pass<'a> {
    module: &'a str,
    classpath: ResolvedClasspath,
    locator: Option<ArtifactLocator>,
    stale_metadata: bool,
}

impl ClasspathAssembler {
    pub fn new(
        build_tool: Arc<dyn BuildTool>,
        modules: Arc<dyn ModuleIndex>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            build_tool,
            modules,
            fs,
            progress: Arc::new(NoOpHandler),
            external_marker: EXTERNAL_MARKER.to_string(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_external_marker(mut self, marker: impl Into<String>) -> Self {
        self.external_marker = marker.into();
        self
    }

    /// Assembles the classpath, logging any build-tool failure and returning an
    /// empty classpath in its place.
    pub async fn assemble(&self, module: &str) -> ResolvedClasspath {
        match self.try_assemble(module).await {
            Ok(classpath) => classpath,
            Err(e) => {
                log_failure(module, &e);
                ResolvedClasspath::new()
            }
        }
    }

    pub async fn try_assemble(&self, module: &str) -> Result<ResolvedClasspath, ResolveError> {
        let workspace_root = self
            .build_tool
            .workspace_root()
            .ok_or_else(|| {
                ResolveError::ToolUnavailable("Bazel workspace root is not set".to_string())
            })?
            .to_path_buf();

        let targets = self.modules.targets_for_module(module);
        let units = self
            .build_tool
            .query_dependencies(module, &targets, self.progress.as_ref(), OPERATION)
            .await?;

        let known_modules = self.modules.modules();
        let ownership = SourceOwnershipResolver::new(workspace_root);
        let mut pass = Pass {
            module,
            classpath: ResolvedClasspath::new(),
            locator: None,
            stale_metadata: false,
        };

        for unit in units.values() {
            match ownership.resolve_owner(&unit.sources, &known_modules) {
                Some(owner) if owner.name == module => {
                    debug!(
                        module = %module,
                        label = %unit.label,
                        "Dependency is the module itself, nothing to do"
                    );
                }
                Some(owner) => {
                    let full_path = owner.full_path();
                    if pass.classpath.push_module(&full_path) {
                        debug!(module = %module, reference = %full_path, "Added module to classpath");
                    }
                    self.modules.ensure_reference(module, &owner.name);
                }
                None => self.add_archives(&mut pass, unit).await?,
            }
        }

        if pass.stale_metadata {
            info!(
                module = %module,
                "Flushing dependency metadata so the next pass can recompute it"
            );
            self.build_tool.flush_dependency_metadata(&targets);
        }

        Ok(pass.classpath)
    }

    async fn add_archives(&self, pass: &mut Pass<'_>, unit: &DependencyUnit) -> Result<(), ResolveError> {
        if unit.archives().next().is_none() {
            return Ok(());
        }

        if pass.locator.is_none() {
            let roots = self.build_tool.output_roots().await?;
            pass.locator = Some(
                ArtifactLocator::new(self.fs.clone(), roots)
                    .with_external_marker(self.external_marker.as_str()),
            );
        }
        let Some(locator) = pass.locator.as_ref() else {
            return Ok(());
        };

        for pair in unit.archives() {
            match locate_pair(locator, pair) {
                Some((primary, present, sources)) => {
                    if !present {
                        pass.stale_metadata = true;
                        self.progress.on_progress(&ProgressEvent::ArchiveMissing {
                            module: pass.module.to_string(),
                            path: primary.display().to_string(),
                        });
                    }
                    pass.classpath.push_library(primary, sources);
                }
                None => {
                    warn!(
                        module = %pass.module,
                        label = %unit.label,
                        "Archive reference could not be resolved to a path"
                    );
                    pass.stale_metadata = true;
                }
            }
        }

        Ok(())
    }
}

/// Locates a primary archive and its sources archive. Both are kept even when
/// absent on disk; the locator has already logged the miss.
fn locate_pair(
    locator: &ArtifactLocator,
    pair: &ArchivePair,
) -> Option<(std::path::PathBuf, bool, Option<std::path::PathBuf>)> {
    let primary = match locator.locate(pair.primary.as_deref()) {
        Ok(Some(located)) => located,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "Skipping malformed archive reference");
            return None;
        }
    };

    let sources = match locator.locate(pair.sources.as_deref()) {
        Ok(Some(located)) => Some(located.path),
        Ok(None) => None,
        Err(e) => {
            debug!(error = %e, "Ignoring malformed sources archive reference");
            None
        }
    };

    Some((primary.path, primary.present, sources))
}

pub(crate) fn log_failure(module: &str, err: &ResolveError) {
    match err {
        ResolveError::ToolUnavailable(msg) => {
            error!(module = %module, "Bazel not found: {}", msg);
        }
        _ => {
            error!(
                module = %module,
                error = %err,
                "Unable to compute classpath container entries"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_tool::MockBuildTool;
    use crate::fs::MockFileSystem;
    use crate::model::{ClasspathEntry, ModuleSourceSet, OutputRoots, SourceRoot};
    use crate::workspace::WorkspaceIndex;
    use std::path::PathBuf;

    struct Fixture {
        tool: Arc<MockBuildTool>,
        index: Arc<WorkspaceIndex>,
        fs: Arc<MockFileSystem>,
    }

    impl Fixture {
        fn new() -> Self {
            let tool = Arc::new(MockBuildTool::new(OutputRoots::new(
                "/mock/base",
                "/mock/ws",
            )));
            let index = Arc::new(WorkspaceIndex::from_modules([
                ModuleSourceSet::new("app", "/mock/ws/app")
                    .with_target("//app:main")
                    .with_source_root(SourceRoot::new("/mock/ws/app/src")),
                ModuleSourceSet::new("lib-core", "/mock/ws/lib-core")
                    .with_target("//lib-core:lib")
                    .with_source_root(SourceRoot::new("/mock/ws/lib-core").include("src/**/*.java")),
            ]));
            Self {
                tool,
                index,
                fs: Arc::new(MockFileSystem::new()),
            }
        }

        fn assembler(&self) -> ClasspathAssembler {
            ClasspathAssembler::new(self.tool.clone(), self.index.clone(), self.fs.clone())
        }
    }

    #[tokio::test]
    async fn test_owned_dependency_becomes_module_reference() {
        let fixture = Fixture::new();
        fixture.tool.add_unit(
            "//app:main",
            DependencyUnit::new("//lib-core:lib").with_sources(["lib-core/src/main/Core.java"]),
        );

        let classpath = fixture.assembler().try_assemble("app").await.unwrap();

        assert_eq!(classpath.entries(), &[ClasspathEntry::module("/lib-core")]);
        assert_eq!(fixture.index.references("app"), vec!["lib-core"]);
    }

    #[tokio::test]
    async fn test_self_reference_is_skipped() {
        let fixture = Fixture::new();
        fixture.tool.add_unit(
            "//app:main",
            DependencyUnit::new("//app:main")
                .with_sources(["app/src/Main.java"])
                .with_generated_jar(ArchivePair::new("bazel-out/bin/app/libmain.jar")),
        );

        let classpath = fixture.assembler().try_assemble("app").await.unwrap();

        assert!(classpath.is_empty());
        assert!(fixture.index.references("app").is_empty());
    }

    #[tokio::test]
    async fn test_units_owned_by_same_module_are_deduplicated() {
        let fixture = Fixture::new();
        fixture.tool.add_unit(
            "//app:main",
            DependencyUnit::new("//lib-core:a").with_sources(["lib-core/src/a/A.java"]),
        );
        fixture.tool.add_unit(
            "//app:main",
            DependencyUnit::new("//lib-core:b").with_sources(["lib-core/src/b/B.java"]),
        );

        let classpath = fixture.assembler().try_assemble("app").await.unwrap();

        assert_eq!(classpath.entries(), &[ClasspathEntry::module("/lib-core")]);
        assert_eq!(fixture.index.references("app"), vec!["lib-core"]);
    }

    #[tokio::test]
    async fn test_unowned_dependency_uses_archives() {
        let fixture = Fixture::new();
        fixture.fs.add_file("base/external/guava/guava.jar", "PK");
        fixture.fs.add_file("ws/bazel-out/bin/gen/libgen.jar", "PK");
        fixture.tool.add_unit(
            "//app:main",
            DependencyUnit::new("@maven//:guava")
                .with_sources(["external/guava/src/Lists.java"])
                .with_generated_jar(ArchivePair::new("bazel-out/bin/gen/libgen.jar"))
                .with_jar(ArchivePair::new("external/guava/guava.jar")),
        );

        let classpath = fixture.assembler().try_assemble("app").await.unwrap();

        assert_eq!(
            classpath.entries(),
            &[
                ClasspathEntry::library(PathBuf::from("/mock/ws/bazel-out/bin/gen/libgen.jar"), None),
                ClasspathEntry::library(PathBuf::from("/mock/base/external/guava/guava.jar"), None),
            ]
        );
        assert!(fixture.tool.flushed_targets().is_empty());
    }

    #[tokio::test]
    async fn test_missing_archive_is_kept_and_flushes_metadata() {
        let fixture = Fixture::new();
        fixture.fs.add_file("base/external/b/b.jar", "PK");
        fixture.tool.add_unit(
            "//app:main",
            DependencyUnit::new("@maven//:a").with_jar(ArchivePair::new("external/a/a.jar")),
        );
        fixture.tool.add_unit(
            "//app:main",
            DependencyUnit::new("@maven//:b").with_jar(ArchivePair::new("external/b/b.jar")),
        );

        let classpath = fixture.assembler().try_assemble("app").await.unwrap();

        assert_eq!(classpath.len(), 2);
        assert_eq!(
            classpath.entries()[0],
            ClasspathEntry::library(PathBuf::from("/mock/base/external/a/a.jar"), None)
        );
        assert_eq!(fixture.tool.flushed_targets(), vec!["//app:main"]);
    }

    #[tokio::test]
    async fn test_missing_sources_archive_is_kept() {
        let fixture = Fixture::new();
        fixture.fs.add_file("base/external/c/c.jar", "PK");
        fixture.tool.add_unit(
            "//app:main",
            DependencyUnit::new("@maven//:c")
                .with_jar(ArchivePair::new("external/c/c.jar").with_sources("external/c/c-src.jar")),
        );

        let classpath = fixture.assembler().try_assemble("app").await.unwrap();

        assert_eq!(
            classpath.entries(),
            &[ClasspathEntry::library(
                PathBuf::from("/mock/base/external/c/c.jar"),
                Some(PathBuf::from("/mock/base/external/c/c-src.jar")),
            )]
        );
        assert!(fixture.tool.flushed_targets().is_empty());
    }

    #[tokio::test]
    async fn test_absent_primary_archive_flushes_without_entry() {
        let fixture = Fixture::new();
        fixture.tool.add_unit(
            "//app:main",
            DependencyUnit::new("@maven//:odd").with_jar(ArchivePair {
                primary: None,
                sources: Some("external/odd/odd-src.jar".to_string()),
            }),
        );

        let classpath = fixture.assembler().try_assemble("app").await.unwrap();

        assert!(classpath.is_empty());
        assert_eq!(fixture.tool.flushed_targets(), vec!["//app:main"]);
    }

    #[tokio::test]
    async fn test_query_failure_yields_empty_classpath() {
        let fixture = Fixture::new();
        fixture
            .tool
            .fail_queries_with(Some(ResolveError::Interrupted("cancelled".to_string())));

        let assembler = fixture.assembler();
        assert!(assembler.try_assemble("app").await.is_err());
        assert!(assembler.assemble("app").await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_workspace_root_is_tool_unavailable() {
        let tool = Arc::new(
            MockBuildTool::new(OutputRoots::new("/mock/base", "/mock/ws")).without_workspace_root(),
        );
        let assembler = ClasspathAssembler::new(
            tool,
            Arc::new(WorkspaceIndex::new()),
            Arc::new(MockFileSystem::new()),
        );

        let err = assembler.try_assemble("app").await.unwrap_err();
        assert!(err.is_tool_unavailable());
    }
}
