//! Centralized file-based logging
//!
//! Writes logs to files in logs/ directory, separated by log type:
//! - logs/main.log - General application logs
//! - logs/error.log - Error and warning logs only
//! - logs/orders.log - Order flow (dispatch + ledger)

use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize centralized file logging
///
/// Creates logs/ directory and sets up file appenders for each log type.
/// Returns WorkerGuards which must be kept alive for the duration of the
/// program.
pub fn init_logging() -> Vec<WorkerGuard> {
    let logs_dir = Path::new("logs");
    if !logs_dir.exists() {
        fs::create_dir_all(logs_dir).expect("Failed to create logs directory");
    }

    for log_type in ["main", "error", "orders"] {
        let dir = logs_dir.join(log_type);
        if !dir.exists() {
            fs::create_dir_all(&dir).expect("Failed to create log subdirectory");
        }
    }

    let mut guards = Vec::new();

    // Main log - all logs
    let (main_appender, main_guard) = create_appender("logs/main", "main");
    guards.push(main_guard);

    // Error log - ERROR and WARN only
    let (error_appender, error_guard) = create_appender("logs/error", "error");
    guards.push(error_guard);

    // Order flow log - dispatch and ledger targets
    let (orders_appender, orders_guard) = create_appender("logs/orders", "orders");
    guards.push(orders_guard);

    let main_layer = tracing_subscriber::fmt::layer()
        .with_writer(main_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .json();

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::LevelFilter::WARN);

    let orders_layer = tracing_subscriber::fmt::layer()
        .with_writer(orders_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target().contains("dispatch") || metadata.target().contains("ledger")
        }));

    // Console layer for the operator
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(EnvFilter::new("info"))
        .with(main_layer)
        .with(error_layer)
        .with(orders_layer)
        .with(console_layer)
        .init();

    tracing::info!("Logging system initialized. Log files in logs/ directory");

    guards
}

/// Create a rolling file appender
fn create_appender(dir: &str, name: &str) -> (NonBlocking, WorkerGuard) {
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, name);

    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    (non_blocking, guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_creation() {
        let test_dir = Path::new("logs_test");
        if test_dir.exists() {
            fs::remove_dir_all(test_dir).ok();
        }

        fs::create_dir_all(test_dir.join("main")).unwrap();
        assert!(test_dir.join("main").exists());

        fs::remove_dir_all(test_dir).ok();
    }
}
