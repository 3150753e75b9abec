//! Log bootstrap: daily-rolling file output with an optional stderr mirror.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Overrides the log root; falls back to `$HOME/.portico/logs`.
const LOG_DIR_ENV: &str = "PORTICO_LOG_DIR";

fn default_log_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(LOG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".portico").join("logs")
}

/// Install the global subscriber, logging to the default directory.
///
/// The returned guard owns the background log writer; hold it for the
/// process lifetime. Dropping it flushes pending output.
pub fn init_logging(component: &str, to_stderr: bool) -> WorkerGuard {
    init_logging_at(&default_log_dir(), component, to_stderr)
}

/// Install the global subscriber, logging into an explicit directory.
/// Files roll daily and are prefixed with `component`.
pub fn init_logging_at(log_dir: &Path, component: &str, to_stderr: bool) -> WorkerGuard {
    let _ = std::fs::create_dir_all(log_dir);
    let appender = tracing_appender::rolling::daily(log_dir, component);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);
    let stderr_layer = to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    guard
}
