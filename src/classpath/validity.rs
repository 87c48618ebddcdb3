//! Module build validity
//!
//! A module is valid when a dry build of its targets reports no problems.

use crate::build_tool::BuildTool;
use crate::model::ProblemMarker;
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use crate::workspace::{is_workspace_module, ModuleIndex};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Outcome of one validity check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub module: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<ProblemMarker>,
    /// Why the check could not run at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckReport {
    fn valid(module: &str) -> Self {
        Self {
            module: module.to_string(),
            valid: true,
            problems: Vec::new(),
            error: None,
        }
    }

    fn failed(module: &str, error: impl Into<String>) -> Self {
        Self {
            module: module.to_string(),
            valid: false,
            problems: Vec::new(),
            error: Some(error.into()),
        }
    }
}

pub struct ValidityChecker {
    build_tool: Arc<dyn BuildTool>,
    modules: Arc<dyn ModuleIndex>,
    progress: Arc<dyn ProgressHandler>,
}

impl ValidityChecker {
    pub fn new(build_tool: Arc<dyn BuildTool>, modules: Arc<dyn ModuleIndex>) -> Self {
        Self {
            build_tool,
            modules,
            progress: Arc::new(NoOpHandler),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    pub async fn is_valid(&self, module: &str) -> bool {
        self.check(module).await.valid
    }

    pub async fn check(&self, module: &str) -> CheckReport {
        if self.build_tool.workspace_root().is_none() {
            warn!(module = %module, "No Bazel workspace root, treating module as invalid");
            return CheckReport::failed(module, "Bazel workspace root is not set");
        }

        if !self.build_tool.is_available().await {
            warn!(module = %module, "Bazel is not available, treating module as invalid");
            return CheckReport::failed(module, "Bazel is not available");
        }

        // the workspace module has no targets of its own
        if is_workspace_module(module) {
            return CheckReport::valid(module);
        }

        let targets = self.modules.targets_for_module(module);
        match self.build_tool.run_check(&targets).await {
            Ok(problems) => {
                for problem in &problems {
                    debug!(
                        module = %module,
                        resource = %problem.resource,
                        line = ?problem.line,
                        "{}",
                        problem.description
                    );
                }
                self.progress.on_progress(&ProgressEvent::CheckComplete {
                    module: module.to_string(),
                    problems: problems.len(),
                });
                CheckReport {
                    module: module.to_string(),
                    valid: problems.is_empty(),
                    problems,
                    error: None,
                }
            }
            Err(e) => {
                error!(module = %module, error = %e, "Unable to run build check");
                CheckReport::failed(module, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_tool::MockBuildTool;
    use crate::error::ResolveError;
    use crate::model::{ModuleSourceSet, OutputRoots, ProblemMarker};
    use crate::workspace::WorkspaceIndex;

    fn index() -> Arc<WorkspaceIndex> {
        Arc::new(WorkspaceIndex::from_modules([
            ModuleSourceSet::new("app", "/ws/app").with_target("//app:main")
        ]))
    }

    fn tool() -> MockBuildTool {
        MockBuildTool::new(OutputRoots::new("/base", "/ws"))
    }

    #[tokio::test]
    async fn test_clean_check_is_valid() {
        let tool = Arc::new(tool());
        let checker = ValidityChecker::new(tool.clone(), index());

        assert!(checker.is_valid("app").await);
        assert_eq!(tool.check_calls(), 1);
    }

    #[tokio::test]
    async fn test_problems_make_module_invalid() {
        let tool = Arc::new(tool());
        tool.set_problems(vec![ProblemMarker {
            resource: "app/src/Main.java".to_string(),
            line: Some(3),
            description: "cannot find symbol".to_string(),
        }]);
        let checker = ValidityChecker::new(tool, index());

        let report = checker.check("app").await;
        assert!(!report.valid);
        assert_eq!(report.problems.len(), 1);
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn test_missing_workspace_root_is_invalid() {
        let tool = Arc::new(tool().without_workspace_root());
        let checker = ValidityChecker::new(tool.clone(), index());

        assert!(!checker.is_valid("app").await);
        assert!(!checker.is_valid("Bazel Workspace").await);
        assert_eq!(tool.check_calls(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_tool_is_invalid() {
        let tool = Arc::new(tool());
        tool.set_available(false);
        let checker = ValidityChecker::new(tool, index());

        assert!(!checker.is_valid("app").await);
    }

    #[tokio::test]
    async fn test_workspace_module_is_valid_without_check() {
        let tool = Arc::new(tool());
        let checker = ValidityChecker::new(tool.clone(), index());

        assert!(checker.is_valid("Bazel Workspace").await);
        assert_eq!(tool.check_calls(), 0);
    }

    #[tokio::test]
    async fn test_check_failure_is_invalid() {
        struct FailingCheck(MockBuildTool);

        #[async_trait::async_trait]
        impl BuildTool for FailingCheck {
            async fn query_dependencies(
                &self,
                module: &str,
                targets: &[String],
                progress: &dyn ProgressHandler,
                operation: &str,
            ) -> Result<crate::build_tool::DependencyMap, ResolveError> {
                self.0
                    .query_dependencies(module, targets, progress, operation)
                    .await
            }

            async fn run_check(
                &self,
                _targets: &[String],
            ) -> Result<Vec<ProblemMarker>, ResolveError> {
                Err(ResolveError::QueryFailed("bazel crashed".to_string()))
            }

            async fn output_roots(&self) -> Result<OutputRoots, ResolveError> {
                self.0.output_roots().await
            }

            fn flush_dependency_metadata(&self, targets: &[String]) {
                self.0.flush_dependency_metadata(targets)
            }

            async fn is_available(&self) -> bool {
                true
            }

            fn workspace_root(&self) -> Option<&std::path::Path> {
                self.0.workspace_root()
            }
        }

        let checker = ValidityChecker::new(Arc::new(FailingCheck(tool())), index());
        let report = checker.check("app").await;
        assert!(!report.valid);
        assert_eq!(
            report.error.as_deref(),
            Some("Dependency query failed: bazel crashed")
        );
    }
}
