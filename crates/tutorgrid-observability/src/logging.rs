use std::path::Path;

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::is_observability_enabled;

/// Keeps the background log writers alive; drop it at shutdown to flush.
pub struct LogGuard {
    _file: WorkerGuard,
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tutorgrid={level},tutorgrid_cli={level},tutorgrid::audit=info,reqwest=warn,hyper=warn"
        ))
    })
}

/// Initialize console logging plus a daily-rotated JSON log file.
///
/// # Configuration
///
/// - **Log Level**: `LOG_LEVEL` (default: "info"), overridden entirely by `RUST_LOG`
/// - **Log Directory**: `LOG_DIR` (default: "storage/logs")
///
/// Falls back to [`init_basic_console_logging`] when `OBSERVABILITY_ENABLED=false`
/// or the log directory cannot be created, in which case no guard is returned.
pub fn init_tracing() -> Option<LogGuard> {
    if !is_observability_enabled() {
        init_basic_console_logging();
        return None;
    }

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "storage/logs".to_string());
    init_tracing_in(Path::new(&log_dir), &log_level)
}

/// [`init_tracing`] with an explicit log directory and level.
pub fn init_tracing_in(log_dir: &Path, log_level: &str) -> Option<LogGuard> {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        init_basic_console_logging();
        warn!(dir = %log_dir.display(), error = %e, "Failed to create log directory, file logging disabled");
        return None;
    }

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(default_filter(log_level));

    // JSON file layer for structured logs (audit trail included)
    let json_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "tutorgrid.json");
    let (json_writer, guard) = tracing_appender::non_blocking(json_appender);

    let json_layer = fmt::layer()
        .json()
        .with_writer(json_writer)
        .with_current_span(true)
        .with_span_list(true)
        .with_filter(EnvFilter::new("info"));

    if tracing_subscriber::registry()
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .is_err()
    {
        warn!("A global tracing subscriber was already installed");
    }

    info!(dir = %log_dir.display(), "Tracing initialized with console and JSON file logging");

    Some(LogGuard { _file: guard })
}

/// Initialize basic console logging only.
///
/// - **Log Level**: Controlled by `LOG_LEVEL` environment variable (default: "info")
/// - **Format**: Compact format written to stderr so command output stays clean
pub fn init_basic_console_logging() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let console_layer = fmt::layer()
        .compact()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(default_filter(&log_level));

    let _ = tracing_subscriber::registry().with(console_layer).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_creates_log_dir() {
        let dir = std::env::temp_dir().join(format!("tutorgrid-logs-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let guard = init_tracing_in(&dir, "debug");
        assert!(guard.is_some());
        assert!(dir.is_dir());
        info!("file layer attached");

        drop(guard);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
