//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, error, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started {
                module,
                had_cached_entries,
                import_mode,
            } => {
                info!(
                    module = %module,
                    cached_entries = had_cached_entries,
                    import = import_mode,
                    "Computing classpath"
                );
            }
            ProgressEvent::CacheHit { module } => {
                info!(module = %module, "Using cached classpath");
            }
            ProgressEvent::QueryStarted {
                module,
                targets,
                operation,
            } => {
                debug!(module = %module, targets, operation = %operation, "Querying build tool");
            }
            ProgressEvent::QueryComplete {
                module,
                units,
                query_time,
            } => {
                debug!(
                    module = %module,
                    units,
                    query_time_ms = query_time.as_millis(),
                    "Dependency metadata received"
                );
            }
            ProgressEvent::ArchiveMissing { module, path } => {
                warn!(module = %module, path = %path, "Archive missing on disk");
            }
            ProgressEvent::Completed {
                module,
                entries,
                total_time,
            } => {
                info!(
                    module = %module,
                    entries,
                    total_time_ms = total_time.as_millis(),
                    "Classpath resolved"
                );
            }
            ProgressEvent::Failed { module, error } => {
                error!(module = %module, error = %error, "Classpath resolution failed");
            }
            ProgressEvent::CheckComplete { module, problems } => {
                if *problems > 0 {
                    warn!(module = %module, problems, "Build check reported problems");
                } else {
                    debug!(module = %module, "Build check clean");
                }
            }
        }
    }
}
