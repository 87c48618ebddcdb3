use std::io;
use thiserror::Error;

/// Why a build-tool interaction failed.
///
/// Resolution never lets these escape its public entry points; they are logged and
/// turned into an empty classpath so callers can retry later.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The build tool could not be located or started
    #[error("Build tool unavailable: {0}")]
    ToolUnavailable(String),

    /// The query ran but failed (non-zero exit, unreadable output, IO error)
    #[error("Dependency query failed: {0}")]
    QueryFailed(String),

    /// The query was interrupted before it produced a result
    #[error("Dependency query interrupted: {0}")]
    Interrupted(String),
}

impl ResolveError {
    pub fn is_tool_unavailable(&self) -> bool {
        matches!(self, ResolveError::ToolUnavailable(_))
    }
}

impl From<io::Error> for ResolveError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                ResolveError::ToolUnavailable(err.to_string())
            }
            io::ErrorKind::Interrupted => ResolveError::Interrupted(err.to_string()),
            _ => ResolveError::QueryFailed(err.to_string()),
        }
    }
}

/// An archive reference that cannot be turned into a path at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocateError {
    #[error("Malformed archive reference {declared:?}: {reason}")]
    Malformed { declared: String, reason: String },
}
