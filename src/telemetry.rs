//! Log sink setup. The terminal belongs to the UI, so records go to a file.

use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::models::storage::get_cache_dir;

pub const LOG_FILE: &str = "casefeed.log";

/// Route `log` records to `<cache dir>/casefeed.log`, filtered by `RUST_LOG`
/// (default `info`). Keep the returned guard alive until exit so buffered
/// lines are flushed. Returns `None` when no log file can be created.
pub fn init_logging() -> Option<WorkerGuard> {
    let dir = get_cache_dir().ok()?;
    fs::create_dir_all(&dir).ok()?;

    let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    log::info!("Logging to {:?}", dir.join(LOG_FILE));
    Some(guard)
}
