//! Logging Infrastructure
//!
//! Console output by default, daily rolling files when a log directory is set.

use std::path::Path;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Initialize the logger with optional file output
///
/// `log_level` is an `EnvFilter` directive such as `info` or
/// `warn,receipt_server=debug`. The log directory is created when missing;
/// if that fails, logs go to the console.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(log_filter(log_level.unwrap_or(DEFAULT_FILTER)))
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if std::fs::create_dir_all(log_path).is_ok()
            && let Some(dir_str) = log_path.to_str()
        {
            let file_appender = tracing_appender::rolling::daily(dir_str, "receipt-server");
            subscriber.with_ansi(false).with_writer(file_appender).init();
            return;
        }
    }

    subscriber.init();
}

/// Parse a filter directive, falling back to `info` when it is malformed
fn log_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("Invalid LOG_LEVEL {directive:?} ({e}), using {DEFAULT_FILTER}");
        EnvFilter::new(DEFAULT_FILTER)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_target_directive() {
        let filter = log_filter("warn,receipt_server=debug").to_string();
        assert!(filter.contains("receipt_server=debug"));
        assert!(filter.contains("warn"));
    }

    #[test]
    fn test_malformed_directive_falls_back() {
        assert_eq!(log_filter("receipt_server=loud").to_string(), "info");
    }
}
