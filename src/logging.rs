//! Logging setup: tracing subscriber with env-filter and optional file
//! output.
//!
//! The returned guard keeps the non-blocking file writer alive; hold it for
//! the lifetime of the process when file logging is enabled.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::constants::DEFAULT_LOG_FILE;

pub fn init(settings: &Settings) -> Option<WorkerGuard> {
    // RUST_LOG wins over the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone()));

    if settings.enable_file_logging {
        let path = settings
            .log_file
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_FILE.into());
        let directory = path.parent().filter(|p| !p.as_os_str().is_empty());
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());

        let appender = tracing_appender::rolling::never(
            directory.unwrap_or_else(|| Path::new(".")),
            file_name,
        );
        let (writer, guard) = tracing_appender::non_blocking(appender);

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        None
    }
}
