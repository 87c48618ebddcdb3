//! Aspect output parsing
//!
//! The classpath aspect writes one JSON document per visited target:
//!
//! ```json
//! {
//!   "label": "//lib:core",
//!   "sources": ["lib/src/main/java/Core.java"],
//!   "generated_jars": [{"jar": "bazel-out/.../libcore.jar", "source_jar": "..."}],
//!   "jars": [],
//!   "dependencies": ["@maven//:guava"]
//! }
//! ```
//!
//! Bazel announces each written file on stderr; [`aspect_files_from_output`]
//! picks those paths out of the build log.

use crate::model::DependencyUnit;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Suffix of the per-target JSON files written by the aspect
pub const ASPECT_FILE_SUFFIX: &str = ".cpresolve.json";

/// Output group that makes Bazel materialise the aspect files
pub const ASPECT_OUTPUT_GROUP: &str = "cpresolve-info";

pub fn parse_aspect_json(content: &str) -> Result<DependencyUnit> {
    let unit: DependencyUnit =
        serde_json::from_str(content).context("Invalid aspect JSON document")?;

    if unit.label.trim().is_empty() {
        bail!("Aspect JSON document has no label");
    }

    Ok(unit)
}

/// Extracts the aspect file paths Bazel printed while building.
///
/// Relative paths are resolved against `workspace_root`. Duplicates are dropped
/// while the first-seen order is kept.
pub fn aspect_files_from_output(output: &str, workspace_root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();

    for line in output.lines() {
        let trimmed = line.trim();
        if !trimmed.ends_with(ASPECT_FILE_SUFFIX) {
            continue;
        }

        let path = Path::new(trimmed);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            workspace_root.join(path)
        };

        if !files.contains(&path) {
            files.push(path);
        }
    }

    files
}
