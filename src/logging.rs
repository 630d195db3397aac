//! Tracing setup: console output plus a rolling log file
//!
//! The file layer is non-blocking; callers must hold the returned guard
//! for the lifetime of the process or buffered lines are lost on exit.

use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn rolling_appender(config: &AppConfig) -> RollingFileAppender {
    use tracing_appender::rolling;

    match config.rotation.as_str() {
        "hourly" => rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => rolling::daily(&config.log_dir, &config.log_file),
        // Anything else means one unrotated file
        _ => rolling::never(&config.log_dir, &config.log_file),
    }
}

/// Install the global subscriber. RUST_LOG wins over the configured level
/// when set.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let (file_writer, guard) = tracing_appender::non_blocking(rolling_appender(config));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.use_json {
        // JSON file only: a machine-readable stream for log shipping,
        // with targets kept for structured queries
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(file_writer),
            )
            .init();
    } else {
        // Human-readable: colored console plus a plain file copy
        subscriber
            .with(fmt::layer().with_target(false).with_ansi(true))
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(file_writer),
            )
            .init();
    }

    guard
}
