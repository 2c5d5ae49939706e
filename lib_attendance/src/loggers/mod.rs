//! # Logging Setup
//!
//! Installs the global `tracing` subscriber: a console layer plus a daily
//! rolling file under the configured log directory. `RUST_LOG` overrides the
//! configured default level.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Rotated files kept next to the active one.
pub const KEEP_LOG_FILES: usize = 7;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("log directory error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("a global subscriber is already installed: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Sets up console and file logging.
///
/// The returned guard flushes the file writer on drop, so the binary must
/// hold it for the lifetime of the process.
pub fn init_tracing(
    log_dir: &Path,
    file_prefix: &str,
    default_level: &str,
) -> Result<WorkerGuard, LoggerError> {
    fs::create_dir_all(log_dir)?;
    prune_old_logs(log_dir, file_prefix, KEEP_LOG_FILES)?;

    let appender = tracing_appender::rolling::daily(log_dir, file_prefix);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()?;

    Ok(guard)
}

/// Deletes all but the `keep` most recently modified files starting with
/// `file_prefix`. Returns how many files were removed.
pub fn prune_old_logs(log_dir: &Path, file_prefix: &str, keep: usize) -> io::Result<usize> {
    let mut entries: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|res| res.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(file_prefix))
        .filter_map(|e| {
            let modified = e.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, e.path()))
        })
        .collect();

    // Newest first
    entries.sort_by(|a, b| b.0.cmp(&a.0));

    let mut removed = 0;
    for (_, path) in entries.iter().skip(keep) {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!("Failed to delete old log file {:?}: {}", path, e),
        }
    }
    Ok(removed)
}
