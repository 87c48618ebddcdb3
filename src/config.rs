//! Resolver configuration
//!
//! Settings are read from `CPRESOLVE_*` environment variables by `Default` and
//! checked by [`ResolverConfig::validate`] before a resolver is built.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CACHE_TIMEOUT_MS: u64 = 30_000;
const MAX_CACHE_TIMEOUT_MS: u64 = 3_600_000;
const DEFAULT_BAZEL_PATH: &str = "bazel";
const DEFAULT_ASPECT: &str = "@cpresolve_aspect//:aspect.bzl%cpresolve_aspect";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Leading path segment marking third-party outputs that live under the output base
pub const EXTERNAL_MARKER: &str = "external";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// How long a resolved classpath may be served from cache
    pub cache_timeout: Duration,
    pub bazel_path: PathBuf,
    pub workspace_root: Option<PathBuf>,
    /// Aspect used to extract per-target dependency metadata
    pub aspect: String,
    pub external_marker: String,
    pub log_level: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let cache_timeout_ms = env::var("CPRESOLVE_CACHE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_CACHE_TIMEOUT_MS);

        let bazel_path = env::var("CPRESOLVE_BAZEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_BAZEL_PATH));

        let workspace_root = env::var("CPRESOLVE_WORKSPACE_ROOT").ok().map(PathBuf::from);

        let aspect = env::var("CPRESOLVE_ASPECT").unwrap_or_else(|_| DEFAULT_ASPECT.to_string());

        let log_level = env::var("CPRESOLVE_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            cache_timeout: Duration::from_millis(cache_timeout_ms),
            bazel_path,
            workspace_root,
            aspect,
            external_marker: EXTERNAL_MARKER.to_string(),
            log_level,
        }
    }
}

impl ResolverConfig {
    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn with_bazel_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.bazel_path = path.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "Cache timeout must be at least 1 millisecond".to_string(),
            ));
        }
        if self.cache_timeout > Duration::from_millis(MAX_CACHE_TIMEOUT_MS) {
            return Err(ConfigError::ValidationFailed(
                "Cache timeout cannot exceed 1 hour".to_string(),
            ));
        }

        if self.bazel_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Bazel path cannot be empty".to_string(),
            ));
        }

        if self.aspect.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Aspect label cannot be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }
}

impl fmt::Display for ResolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Resolver Configuration:")?;
        writeln!(f, "  Cache Timeout: {}ms", self.cache_timeout.as_millis())?;
        writeln!(f, "  Bazel: {}", self.bazel_path.display())?;
        if let Some(ref root) = self.workspace_root {
            writeln!(f, "  Workspace Root: {}", root.display())?;
        }
        writeln!(f, "  Aspect: {}", self.aspect)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
