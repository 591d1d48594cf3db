//! Binary-side tracing setup: one daily-rolled file under the playground log dir.
//!
//! `RUST_LOG` overrides the default `playground=info` filter.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "playground.log";
const DEFAULT_FILTER: &str = "playground=info";

/// Keeps the background writer alive; dropping it flushes pending lines.
pub struct LoggingGuard {
    _writer: WorkerGuard,
    log_dir: PathBuf,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

/// Cache-dir logs, or a temp dir when the cache dir cannot be created.
fn resolve_log_dir() -> Option<PathBuf> {
    if let Ok(dir) = playground::kernel::services::adapters::ensure_log_dir() {
        return Some(dir);
    }
    let fallback = std::env::temp_dir().join("playground").join("logs");
    std::fs::create_dir_all(&fallback).ok()?;
    Some(fallback)
}

/// Returns `None` when no log dir is usable or a subscriber is already installed.
pub fn init() -> Option<LoggingGuard> {
    let log_dir = resolve_log_dir()?;
    let (writer, writer_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .ok()?;

    // panics would otherwise only reach stderr
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "playground panicked");
    }));
    tracing::info!(log_dir = %log_dir.display(), "logging to file");

    Some(LoggingGuard {
        _writer: writer_guard,
        log_dir,
    })
}
