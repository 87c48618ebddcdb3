//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while a module's classpath is resolved or checked
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A fresh resolution pass started
    Started {
        module: String,
        had_cached_entries: bool,
        import_mode: bool,
    },

    /// The cached classpath was served
    CacheHit { module: String },

    /// Dependency metadata query sent to the build tool
    QueryStarted {
        module: String,
        targets: usize,
        operation: String,
    },

    /// Dependency metadata received
    QueryComplete {
        module: String,
        units: usize,
        query_time: Duration,
    },

    /// A declared archive was not found on disk
    ArchiveMissing { module: String, path: String },

    /// Resolution pass finished
    Completed {
        module: String,
        entries: usize,
        total_time: Duration,
    },

    /// Resolution pass aborted
    Failed { module: String, error: String },

    /// Dry build of the module's targets finished
    CheckComplete { module: String, problems: usize },
}

/// Trait for handling progress events during resolution
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
