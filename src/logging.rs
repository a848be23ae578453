//! Tracing setup: compact stdout output plus an append-only log file.
//!
//! `STUDENT_RECORDS_LOG_FILE` picks the file (`off` disables file logging); the default is
//! `logs/student-records.log`. `RUST_LOG` filters both outputs and defaults to `info`.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_FILE_ENV: &str = "STUDENT_RECORDS_LOG_FILE";
const DEFAULT_LOG_FILE: &str = "logs/student-records.log";

/// Install the global subscriber. Call once, early in `main`.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).compact());

    let file_layer = log_file_path(std::env::var(LOG_FILE_ENV).ok())
        .and_then(|path| open_file_writer(&path))
        .map(|writer| {
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact()
        });

    registry.with(file_layer).init();
}

/// Resolve the log file from the raw environment value.
fn log_file_path(configured: Option<String>) -> Option<PathBuf> {
    match configured.as_deref().map(str::trim) {
        Some("off") | Some("none") => None,
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => Some(PathBuf::from(DEFAULT_LOG_FILE)),
    }
}

fn open_file_writer(path: &Path) -> Option<NonBlocking> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(parent) {
            eprintln!("Failed to create log directory {}: {err}", parent.display());
            return None;
        }
    }

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}
