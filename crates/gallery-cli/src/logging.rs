use anyhow::{Context, Result};
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::fmt;

/// Log to the console and, with `log_dir`, to `crawler_YYYYMMDD_HHMMSS.log`.
///
/// The returned guard flushes the file writer when dropped.
pub fn init_logging(debug: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let name = format!(
                "crawler_{}.log",
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            );
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(false)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .compact(),
        )
        .with(file_layer)
        .with(level)
        .init();

    Ok(guard)
}
