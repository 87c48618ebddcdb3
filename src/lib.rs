//! cpresolve - Bazel classpath resolution for IDE project models
//!
//! Given a workspace module, cpresolve asks Bazel for the dependency metadata of
//! the module's targets and decides, per dependency, whether it is already present
//! in the workspace as source (a module reference) or has to come from a prebuilt
//! archive under one of Bazel's output roots (a library reference).
//!
//! # Core Concepts
//!
//! - **Build tool**: [`BuildTool`] abstracts the Bazel queries; [`BazelRunner`]
//!   runs the real binary, [`build_tool::MockBuildTool`] scripts responses
//! - **Workspace**: [`ModuleIndex`] exposes the modules already imported and
//!   records module-to-module references
//! - **Resolution**: [`ClasspathResolver`] combines the assembler with a
//!   per-target cache that expires after a short timeout and is bypassed while a
//!   bulk import is running
//!
//! # Example Usage
//!
//! ```ignore
//! use cpresolve::{BazelRunner, ClasspathResolver, ResolverConfig, WorkspaceIndex};
//! use cpresolve::fs::RealFileSystem;
//! use std::sync::Arc;
//!
//! async fn classpath_of(index: WorkspaceIndex) -> anyhow::Result<()> {
//!     let config = ResolverConfig::default().with_workspace_root("/src/monorepo");
//!     let runner = BazelRunner::from_config(&config)?;
//!     let resolver = ClasspathResolver::new(
//!         Arc::new(runner),
//!         Arc::new(index),
//!         Arc::new(RealFileSystem::new()),
//!         &config,
//!     );
//!
//!     for entry in resolver.resolve("app").await {
//!         println!("{:?}", entry);
//!     }
//!     Ok(())
//! }
//! ```

pub mod build_tool;
pub mod classpath;
pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod model;
pub mod progress;
pub mod util;
pub mod workspace;

pub use build_tool::{BazelRunner, BuildTool, DependencyMap};
pub use classpath::{
    ArtifactLocator, CheckReport, ClasspathAssembler, ClasspathResolver, ImportGuard, ImportMode,
    ResolutionCache, SourceOwnershipResolver, ValidityChecker,
};
pub use config::{ConfigError, ResolverConfig};
pub use error::{LocateError, ResolveError};
pub use model::{
    ArchivePair, ClasspathEntry, DependencyUnit, ModuleSourceSet, OutputRoots, ProblemMarker,
    ResolvedClasspath, SourceRoot,
};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};
pub use workspace::{ModuleIndex, WorkspaceError, WorkspaceIndex, WorkspaceManifest};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "cpresolve");
    }
}
