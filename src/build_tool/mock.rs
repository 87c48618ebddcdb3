use super::{BuildTool, DependencyMap};
use crate::error::ResolveError;
use crate::model::{DependencyUnit, OutputRoots, ProblemMarker};
use crate::progress::{ProgressEvent, ProgressHandler};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted [`BuildTool`] that records how it was called.
pub struct MockBuildTool {
    units: Mutex<HashMap<String, Vec<DependencyUnit>>>,
    roots: OutputRoots,
    workspace_root: Option<PathBuf>,
    query_error: Mutex<Option<ResolveError>>,
    problems: Mutex<Vec<ProblemMarker>>,
    available: AtomicBool,
    query_delay: Mutex<Option<Duration>>,
    query_calls: AtomicUsize,
    check_calls: AtomicUsize,
    flushed: Mutex<Vec<String>>,
}

impl MockBuildTool {
    pub fn new(roots: OutputRoots) -> Self {
        Self {
            units: Mutex::new(HashMap::new()),
            workspace_root: Some(roots.exec_root.clone()),
            roots,
            query_error: Mutex::new(None),
            problems: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            query_delay: Mutex::new(None),
            query_calls: AtomicUsize::new(0),
            check_calls: AtomicUsize::new(0),
            flushed: Mutex::new(Vec::new()),
        }
    }

    pub fn without_workspace_root(mut self) -> Self {
        self.workspace_root = None;
        self
    }

    /// Registers a dependency unit reported for `target`
    pub fn add_unit(&self, target: impl Into<String>, unit: DependencyUnit) {
        self.units
            .lock()
            .unwrap()
            .entry(target.into())
            .or_default()
            .push(unit);
    }

    /// Makes every following query fail with `error` until cleared
    pub fn fail_queries_with(&self, error: Option<ResolveError>) {
        *self.query_error.lock().unwrap() = error;
    }

    pub fn set_problems(&self, problems: Vec<ProblemMarker>) {
        *self.problems.lock().unwrap() = problems;
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_query_delay(&self, delay: Duration) {
        *self.query_delay.lock().unwrap() = Some(delay);
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn flushed_targets(&self) -> Vec<String> {
        self.flushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildTool for MockBuildTool {
    async fn query_dependencies(
        &self,
        module: &str,
        targets: &[String],
        progress: &dyn ProgressHandler,
        operation: &str,
    ) -> Result<DependencyMap, ResolveError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        progress.on_progress(&ProgressEvent::QueryStarted {
            module: module.to_string(),
            targets: targets.len(),
            operation: operation.to_string(),
        });

        let delay = *self.query_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.query_error.lock().unwrap().clone() {
            return Err(err);
        }

        let units = self.units.lock().unwrap();
        let result: DependencyMap = targets
            .iter()
            .filter_map(|t| units.get(t))
            .flatten()
            .map(|unit| (unit.label.clone(), unit.clone()))
            .collect();
        Ok(result)
    }

    async fn run_check(&self, _targets: &[String]) -> Result<Vec<ProblemMarker>, ResolveError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.problems.lock().unwrap().clone())
    }

    async fn output_roots(&self) -> Result<OutputRoots, ResolveError> {
        Ok(self.roots.clone())
    }

    fn flush_dependency_metadata(&self, targets: &[String]) {
        self.flushed.lock().unwrap().extend(targets.iter().cloned());
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }
}
