//! Build-tool collaborator interface
//!
//! The resolver never spawns processes itself. Everything it needs from the build
//! tool goes through [`BuildTool`]: per-target dependency metadata, a dry-build
//! check, the two output roots, and a hook to drop stale memoised metadata.

pub mod aspect;
pub mod bazel;
pub mod mock;

use crate::error::ResolveError;
use crate::model::{DependencyUnit, OutputRoots, ProblemMarker};
use crate::progress::ProgressHandler;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

pub use bazel::BazelRunner;
pub use mock::MockBuildTool;

/// Dependency metadata keyed by the label of each dependency unit
pub type DependencyMap = BTreeMap<String, DependencyUnit>;

#[async_trait]
pub trait BuildTool: Send + Sync {
    /// Returns metadata for every dependency unit reachable from `targets`.
    ///
    /// `module` and `operation` only label the request for diagnostics.
    async fn query_dependencies(
        &self,
        module: &str,
        targets: &[String],
        progress: &dyn ProgressHandler,
        operation: &str,
    ) -> Result<DependencyMap, ResolveError>;

    /// Dry-builds `targets`; an empty result means they build cleanly
    async fn run_check(&self, targets: &[String]) -> Result<Vec<ProblemMarker>, ResolveError>;

    async fn output_roots(&self) -> Result<OutputRoots, ResolveError>;

    /// Drops memoised metadata for `targets` so the next query recomputes it
    fn flush_dependency_metadata(&self, targets: &[String]);

    /// Whether the tool binary can be invoked at all
    async fn is_available(&self) -> bool;

    fn workspace_root(&self) -> Option<&Path>;
}
