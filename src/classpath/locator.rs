//! Artifact location
//!
//! Archive references reported by the build tool are relative to one of two
//! output roots: `external/...` paths live under the output base, everything else
//! under the execution root. Bazel materialises many of these as symlinks into its
//! cache, so links are resolved to their real target before being handed out.
//!
//! A missing archive is not an error here. The path is still returned with
//! `present == false`, and the parent directory is logged to help work out what
//! the build actually produced.

use crate::config::EXTERNAL_MARKER;
use crate::error::LocateError;
use crate::fs::FileSystem;
use crate::model::OutputRoots;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::error;

/// Upper bound on directory entries included in a missing-archive diagnostic
const MAX_LISTED_ENTRIES: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedArtifact {
    pub path: PathBuf,
    /// False when the file (or the symlink's target) was not found on disk
    pub present: bool,
}

pub struct ArtifactLocator {
    fs: Arc<dyn FileSystem>,
    roots: OutputRoots,
    external_marker: String,
}

impl ArtifactLocator {
    pub fn new(fs: Arc<dyn FileSystem>, roots: OutputRoots) -> Self {
        Self {
            fs,
            roots,
            external_marker: EXTERNAL_MARKER.to_string(),
        }
    }

    pub fn with_external_marker(mut self, marker: impl Into<String>) -> Self {
        self.external_marker = marker.into();
        self
    }

    /// Resolves a declared archive reference to an on-disk path.
    ///
    /// Returns `Ok(None)` when nothing was declared. Only references that cannot
    /// form a path at all (empty, embedded NUL) are errors.
    pub fn locate(&self, declared: Option<&str>) -> Result<Option<LocatedArtifact>, LocateError> {
        let Some(declared) = declared else {
            return Ok(None);
        };

        let trimmed = declared.trim();
        if trimmed.is_empty() {
            return Err(LocateError::Malformed {
                declared: declared.to_string(),
                reason: "empty reference".to_string(),
            });
        }
        if trimmed.contains('\0') {
            return Err(LocateError::Malformed {
                declared: declared.to_string(),
                reason: "contains a NUL byte".to_string(),
            });
        }

        let path = self.root_for(trimmed).join(trimmed);

        if self.fs.is_symlink(&path) {
            return Ok(Some(match self.fs.canonicalize(&path) {
                Ok(target) => LocatedArtifact {
                    path: target,
                    present: true,
                },
                Err(_) => {
                    self.report_missing(&path, "symlink target does not exist");
                    LocatedArtifact {
                        path,
                        present: false,
                    }
                }
            }));
        }

        let present = self.fs.exists(&path);
        if !present {
            self.report_missing(&path, "file does not exist");
        }
        Ok(Some(LocatedArtifact { path, present }))
    }

    fn root_for(&self, declared: &str) -> &Path {
        let first = Path::new(declared).components().next();
        match first {
            Some(Component::Normal(segment)) if segment == self.external_marker.as_str() => {
                &self.roots.output_base
            }
            _ => &self.roots.exec_root,
        }
    }

    fn report_missing(&self, path: &Path, reason: &str) {
        let listing = self.directory_listing(path);
        error!(
            path = %path.display(),
            reason,
            listing = %listing,
            "Problem adding archive to classpath because it does not exist on the filesystem"
        );
    }

    /// Lists the closest existing ancestor of `path`
    fn directory_listing(&self, path: &Path) -> String {
        let Some(dir) = path.ancestors().skip(1).find(|dir| self.fs.is_dir(dir)) else {
            return "<no existing parent directory>".to_string();
        };

        match self.fs.read_dir(dir) {
            Ok(entries) => {
                let mut names: Vec<String> = entries
                    .iter()
                    .take(MAX_LISTED_ENTRIES)
                    .map(|e| e.display_name())
                    .collect();
                if entries.len() > MAX_LISTED_ENTRIES {
                    names.push("...".to_string());
                }
                format!("{}: [{}]", dir.display(), names.join(", "))
            }
            Err(e) => format!("{}: <unreadable: {}>", dir.display(), e),
        }
    }
}
