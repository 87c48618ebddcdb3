//! Bazel-backed [`BuildTool`]
//!
//! Dependency metadata comes from building the requested targets with the
//! classpath aspect and reading the JSON files it writes. Results are memoised
//! per requested target until [`BuildTool::flush_dependency_metadata`] drops them.

use super::aspect::{aspect_files_from_output, parse_aspect_json, ASPECT_OUTPUT_GROUP};
use super::{BuildTool, DependencyMap};
use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::fs::{FileSystem, RealFileSystem};
use crate::model::{OutputRoots, ProblemMarker};
use crate::progress::{ProgressEvent, ProgressHandler};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

pub struct BazelRunner {
    bazel: PathBuf,
    workspace_root: PathBuf,
    aspect: String,
    fs: Arc<dyn FileSystem>,
    metadata: Mutex<HashMap<String, DependencyMap>>,
    roots: OnceCell<OutputRoots>,
    available: OnceCell<bool>,
}

impl BazelRunner {
    pub fn new(
        bazel: impl Into<PathBuf>,
        workspace_root: impl Into<PathBuf>,
        aspect: impl Into<String>,
    ) -> Self {
        Self {
            bazel: bazel.into(),
            workspace_root: workspace_root.into(),
            aspect: aspect.into(),
            fs: Arc::new(RealFileSystem::new()),
            metadata: Mutex::new(HashMap::new()),
            roots: OnceCell::new(),
            available: OnceCell::new(),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Result<Self, ResolveError> {
        let root = config.workspace_root.clone().ok_or_else(|| {
            ResolveError::ToolUnavailable("Bazel workspace root is not configured".to_string())
        })?;
        Ok(Self::new(&config.bazel_path, root, &config.aspect))
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    async fn run(&self, args: &[String]) -> Result<Output, ResolveError> {
        debug!(bazel = %self.bazel.display(), ?args, "Running bazel");
        let output = Command::new(&self.bazel)
            .args(args)
            .current_dir(&self.workspace_root)
            .output()
            .await?;
        Ok(output)
    }

    async fn info(&self, key: &str) -> Result<PathBuf, ResolveError> {
        let output = self.run(&["info".to_string(), key.to_string()]).await?;
        if !output.status.success() {
            return Err(ResolveError::QueryFailed(format!(
                "bazel info {} failed: {}",
                key,
                last_line(&String::from_utf8_lossy(&output.stderr))
            )));
        }

        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if value.is_empty() {
            return Err(ResolveError::QueryFailed(format!(
                "bazel info {} returned nothing",
                key
            )));
        }
        Ok(PathBuf::from(value))
    }

    async fn query_target(&self, target: &str) -> Result<DependencyMap, ResolveError> {
        let args = vec![
            "build".to_string(),
            format!("--aspects={}", self.aspect),
            format!("--output_groups={}", ASPECT_OUTPUT_GROUP),
            target.to_string(),
        ];
        let output = self.run(&args).await?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(ResolveError::QueryFailed(format!(
                "aspect build of {} failed: {}",
                target,
                last_line(&stderr)
            )));
        }

        let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
        log.push('\n');
        log.push_str(&stderr);

        let mut units = DependencyMap::new();
        for file in aspect_files_from_output(&log, &self.workspace_root) {
            let parsed = self
                .fs
                .read_to_string(&file)
                .and_then(|content| parse_aspect_json(&content));
            match parsed {
                Ok(unit) => {
                    units.insert(unit.label.clone(), unit);
                }
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Skipping unreadable aspect file");
                }
            }
        }

        Ok(units)
    }

    fn cached_metadata(&self, target: &str) -> Option<DependencyMap> {
        self.metadata.lock().ok()?.get(target).cloned()
    }
}

#[async_trait]
impl BuildTool for BazelRunner {
    async fn query_dependencies(
        &self,
        module: &str,
        targets: &[String],
        progress: &dyn ProgressHandler,
        operation: &str,
    ) -> Result<DependencyMap, ResolveError> {
        let start = Instant::now();
        progress.on_progress(&ProgressEvent::QueryStarted {
            module: module.to_string(),
            targets: targets.len(),
            operation: operation.to_string(),
        });

        let mut result = DependencyMap::new();
        for target in targets {
            let units = match self.cached_metadata(target) {
                Some(units) => units,
                None => {
                    let units = self.query_target(target).await?;
                    if let Ok(mut metadata) = self.metadata.lock() {
                        metadata.insert(target.clone(), units.clone());
                    }
                    units
                }
            };
            result.extend(units);
        }

        progress.on_progress(&ProgressEvent::QueryComplete {
            module: module.to_string(),
            units: result.len(),
            query_time: start.elapsed(),
        });
        Ok(result)
    }

    async fn run_check(&self, targets: &[String]) -> Result<Vec<ProblemMarker>, ResolveError> {
        let mut args = vec!["build".to_string(), "--keep_going".to_string()];
        args.extend(targets.iter().cloned());

        let output = self.run(&args).await?;
        if output.status.success() {
            return Ok(Vec::new());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut markers = parse_problem_markers(&stderr);
        if markers.is_empty() {
            markers.push(ProblemMarker {
                resource: targets.join(" "),
                line: None,
                description: last_line(&stderr).to_string(),
            });
        }
        Ok(markers)
    }

    async fn output_roots(&self) -> Result<OutputRoots, ResolveError> {
        self.roots
            .get_or_try_init(|| async {
                let output_base = self.info("output_base").await?;
                let exec_root = self.info("execution_root").await?;
                Ok::<_, ResolveError>(OutputRoots::new(output_base, exec_root))
            })
            .await
            .cloned()
    }

    fn flush_dependency_metadata(&self, targets: &[String]) {
        if let Ok(mut metadata) = self.metadata.lock() {
            for target in targets {
                metadata.remove(target);
            }
        }
        debug!(?targets, "Flushed dependency metadata");
    }

    async fn is_available(&self) -> bool {
        *self
            .available
            .get_or_init(|| async {
                match Command::new(&self.bazel).arg("--version").output().await {
                    Ok(output) => output.status.success(),
                    Err(e) => {
                        warn!(bazel = %self.bazel.display(), error = %e, "Bazel not found");
                        false
                    }
                }
            })
            .await
    }

    fn workspace_root(&self) -> Option<&Path> {
        Some(&self.workspace_root)
    }
}

/// Turns `ERROR: <file>:<line>:<col>: <message>` lines into problem markers
pub fn parse_problem_markers(output: &str) -> Vec<ProblemMarker> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("ERROR: "))
        .filter_map(|rest| rest.split_once(": "))
        .map(|(location, message)| {
            let mut parts = location.rsplitn(3, ':');
            let col = parts.next();
            let line = parts.next();
            let file = parts.next();

            match (file, line.and_then(|l| l.parse::<u32>().ok()), col.map(|c| c.parse::<u32>())) {
                (Some(file), Some(line), Some(Ok(_))) => ProblemMarker {
                    resource: file.to_string(),
                    line: Some(line),
                    description: message.to_string(),
                },
                _ => ProblemMarker {
                    resource: location.to_string(),
                    line: None,
                    description: message.to_string(),
                },
            }
        })
        .collect()
}

fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output")
}
