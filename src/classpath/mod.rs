//! Classpath resolution
//!
//! [`ClasspathResolver`] is the public entry point. It serves cached results when
//! they are fresh and otherwise runs the [`ClasspathAssembler`] inside the
//! module's critical section, so a module is never assembled twice at once.
//!
//! Resolution never fails from the caller's point of view: build-tool problems
//! are logged and surface as an empty classpath until a later pass succeeds.

pub mod assembler;
pub mod cache;
pub mod locator;
pub mod ownership;
pub mod validity;

pub use assembler::ClasspathAssembler;
pub use cache::{
    CacheEntry, CacheRecord, ImportGuard, ImportMode, Lookup, MissReason, ResolutionCache,
    DEFAULT_CACHE_TIMEOUT,
};
pub use locator::{ArtifactLocator, LocatedArtifact};
pub use ownership::SourceOwnershipResolver;
pub use validity::{CheckReport, ValidityChecker};

use crate::build_tool::BuildTool;
use crate::config::ResolverConfig;
use crate::fs::FileSystem;
use crate::model::ResolvedClasspath;
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use crate::workspace::{is_workspace_module, ModuleIndex};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub struct ClasspathResolver {
    assembler: ClasspathAssembler,
    validity: ValidityChecker,
    cache: ResolutionCache,
    progress: Arc<dyn ProgressHandler>,
}

impl ClasspathResolver {
    pub fn new(
        build_tool: Arc<dyn BuildTool>,
        modules: Arc<dyn ModuleIndex>,
        fs: Arc<dyn FileSystem>,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            assembler: ClasspathAssembler::new(build_tool.clone(), modules.clone(), fs)
                .with_external_marker(config.external_marker.as_str()),
            validity: ValidityChecker::new(build_tool, modules),
            cache: ResolutionCache::new(config.cache_timeout, ImportMode::new()),
            progress: Arc::new(NoOpHandler),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.assembler = self.assembler.with_progress(progress.clone());
        self.validity = self.validity.with_progress(progress.clone());
        self.progress = progress;
        self
    }

    /// Shares an import flag owned by whoever drives bulk imports
    pub fn with_import_mode(mut self, import_mode: ImportMode) -> Self {
        self.cache = ResolutionCache::new(self.cache.timeout(), import_mode);
        self
    }

    pub fn import_mode(&self) -> &ImportMode {
        self.cache.import_mode()
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Resolves the classpath of `module`, from cache when possible.
    pub async fn resolve(&self, module: &str) -> ResolvedClasspath {
        if is_workspace_module(module) {
            debug!(module = %module, "Workspace module has no classpath");
            return ResolvedClasspath::new();
        }

        let mut entry = self.cache.lock(module).await;
        let had_cached_entries = entry.has_record();

        let reason = match entry.lookup() {
            Lookup::Hit(classpath) => {
                self.progress.on_progress(&ProgressEvent::CacheHit {
                    module: module.to_string(),
                });
                return classpath;
            }
            Lookup::Miss(reason) => reason,
        };

        let import_mode = reason == MissReason::ImportInProgress || self.import_mode().is_active();
        if import_mode {
            info!(
                module = %module,
                "Recomputing classpath because an import operation is in progress"
            );
        }
        self.progress.on_progress(&ProgressEvent::Started {
            module: module.to_string(),
            had_cached_entries,
            import_mode,
        });

        let start = Instant::now();
        match self.assembler.try_assemble(module).await {
            Ok(classpath) => {
                if entry.store(classpath.clone()) {
                    debug!(module = %module, entries = classpath.len(), "Cached the classpath");
                }
                self.progress.on_progress(&ProgressEvent::Completed {
                    module: module.to_string(),
                    entries: classpath.len(),
                    total_time: start.elapsed(),
                });
                classpath
            }
            Err(e) => {
                assembler::log_failure(module, &e);
                self.progress.on_progress(&ProgressEvent::Failed {
                    module: module.to_string(),
                    error: e.to_string(),
                });
                ResolvedClasspath::new()
            }
        }
    }

    pub async fn is_valid(&self, module: &str) -> bool {
        self.validity.is_valid(module).await
    }

    pub async fn check(&self, module: &str) -> CheckReport {
        self.validity.check(module).await
    }

    /// Drops every cached classpath, e.g. after the workspace changed wholesale
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}
