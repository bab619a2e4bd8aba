//! Sync core for a Notion task-list desktop widget: mirrors one remote
//! database into a local SQLite store and replays local edits back out.
//! The presentation layer lives elsewhere and consumes the verbs on
//! [`SyncCoordinator`].

mod config;
mod coordinator;
mod dates;
mod errors;
mod mapper;
mod models;
mod remote;
mod store;

pub use coordinator::{Authority, SyncCoordinator};
pub use dates::DateCursor;
pub use errors::{AppError, AppResult};
pub use mapper::{record_to_block, remote_to_records};
pub use models::{
    BlockType, ContentBlock, DatabaseEntry, HandleElement, LoadedTasks, ObjectHandle,
    RecordFilter, RecordPatch, RichTextRun, TaskRecord, TaskSource,
};
pub use remote::{NotionClient, RemoteApi};
pub use store::TaskStore;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Wires structured logging to a daily-rolling file under `log_dir`. The
/// hosting UI calls this once at startup.
pub fn init_tracing(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "widget.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
