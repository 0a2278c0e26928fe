use chrono_tz::Tz;
use remit_printer::SimulatedBehavior;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::printing::{MonitorConfig, ReceiptLayout};

/// Where print jobs are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStoreKind {
    /// Lost on restart
    Memory,
    /// `print_queue.redb` in the work directory
    Redb,
}

impl QueueStoreKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "redb" => Some(Self::Redb),
            _ => None,
        }
    }
}

/// Behavior of the simulated printer used when no printer address is set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationProfile {
    Reliable,
    Flaky,
}

impl SimulationProfile {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reliable" => Some(Self::Reliable),
            "flaky" => Some(Self::Flaky),
            _ => None,
        }
    }

    pub fn behavior(self) -> SimulatedBehavior {
        match self {
            Self::Reliable => SimulatedBehavior::reliable(),
            Self::Flaky => SimulatedBehavior::flaky(),
        }
    }
}

/// Receipt server configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./data | durable queue and logs |
/// | LOG_LEVEL | info | tracing max level |
/// | LOG_DIR | (unset) | daily rolling log files |
/// | PRINTER_ADDR | (unset) | `host:port` of a network printer |
/// | PRINTER_MODEL | XP-80C (Simulated) | model name |
/// | PRINTER_SIMULATION | flaky | `reliable` or `flaky` |
/// | PAPER_WIDTH | 48 | characters per line |
/// | STATUS_POLL_INTERVAL_SECS | 30 | monitor interval |
/// | STATUS_POLL_TIMEOUT_MS | 3000 | status query timeout |
/// | PRINT_WRITE_TIMEOUT_MS | 10000 | write timeout |
/// | QUEUE_SWEEP_INTERVAL_SECS | 5 | worker sweep interval |
/// | QUEUE_STORE | memory | `memory` or `redb` |
/// | RECEIPT_TIMEZONE | UTC | IANA zone for receipt dates |
/// | BUSINESS_NAME | Remittance Receipt | receipt title |
/// | RECEIPT_FOOTER | Thank you for your business! | footer line |
/// | OPEN_CASH_DRAWER | false | drawer pulse after the cut |
/// | LOW_PAPER_THRESHOLD | 20 | paper warning (%) |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | background task shutdown limit |
///
/// Unparseable values fall back to the default.
///
/// ```ignore
/// PRINTER_ADDR=192.168.1.50:9100 QUEUE_STORE=redb cargo run -p receipt-server
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    /// `EnvFilter` directive, e.g. `info` or `warn,receipt_server=debug`
    pub log_level: String,
    pub log_dir: Option<String>,
    /// Simulated printer when unset
    pub printer_addr: Option<String>,
    pub printer_model: String,
    pub printer_simulation: SimulationProfile,
    pub paper_width: usize,
    pub status_poll_interval_secs: u64,
    pub status_poll_timeout_ms: u64,
    pub print_write_timeout_ms: u64,
    pub queue_sweep_interval_secs: u64,
    pub queue_store: QueueStoreKind,
    pub receipt_timezone: Tz,
    pub business_name: String,
    pub receipt_footer: String,
    pub open_cash_drawer: bool,
    pub low_paper_threshold: u8,
    pub shutdown_timeout_ms: u64,
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = &lookup as &dyn Fn(&str) -> Option<String>;
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            work_dir: non_empty("WORK_DIR").unwrap_or_else(|| "./data".into()),
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: non_empty("LOG_DIR"),
            printer_addr: non_empty("PRINTER_ADDR"),
            printer_model: non_empty("PRINTER_MODEL")
                .unwrap_or_else(|| "XP-80C (Simulated)".into()),
            printer_simulation: lookup("PRINTER_SIMULATION")
                .and_then(|v| SimulationProfile::parse(&v))
                .unwrap_or(SimulationProfile::Flaky),
            paper_width: parse_var(lookup, "PAPER_WIDTH")
                .filter(|w: &usize| *w >= 16)
                .unwrap_or(48),
            status_poll_interval_secs: parse_var(lookup, "STATUS_POLL_INTERVAL_SECS")
                .filter(|s: &u64| *s > 0)
                .unwrap_or(30),
            status_poll_timeout_ms: parse_var(lookup, "STATUS_POLL_TIMEOUT_MS").unwrap_or(3000),
            print_write_timeout_ms: parse_var(lookup, "PRINT_WRITE_TIMEOUT_MS").unwrap_or(10000),
            queue_sweep_interval_secs: parse_var(lookup, "QUEUE_SWEEP_INTERVAL_SECS")
                .filter(|s: &u64| *s > 0)
                .unwrap_or(5),
            queue_store: lookup("QUEUE_STORE")
                .and_then(|v| QueueStoreKind::parse(&v))
                .unwrap_or(QueueStoreKind::Memory),
            receipt_timezone: parse_var(lookup, "RECEIPT_TIMEZONE").unwrap_or(Tz::UTC),
            business_name: non_empty("BUSINESS_NAME")
                .unwrap_or_else(|| "Remittance Receipt".into()),
            receipt_footer: lookup("RECEIPT_FOOTER")
                .unwrap_or_else(|| "Thank you for your business!".into()),
            open_cash_drawer: parse_var(lookup, "OPEN_CASH_DRAWER").unwrap_or(false),
            low_paper_threshold: parse_var(lookup, "LOW_PAPER_THRESHOLD")
                .filter(|t: &u8| *t <= 100)
                .unwrap_or(shared::models::LOW_PAPER_THRESHOLD),
            shutdown_timeout_ms: parse_var(lookup, "SHUTDOWN_TIMEOUT_MS").unwrap_or(10000),
        }
    }

    pub fn queue_db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("print_queue.redb")
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.print_write_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.queue_sweep_interval_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_secs(self.status_poll_interval_secs),
            timeout: Duration::from_millis(self.status_poll_timeout_ms),
            low_paper_threshold: self.low_paper_threshold,
            model_hint: self.printer_model.clone(),
        }
    }

    pub fn receipt_layout(&self) -> ReceiptLayout {
        let footer_lines = if self.receipt_footer.trim().is_empty() {
            Vec::new()
        } else {
            vec![self.receipt_footer.clone()]
        };
        ReceiptLayout {
            width: self.paper_width,
            business_name: self.business_name.clone(),
            header_lines: Vec::new(),
            footer_lines,
            timezone: self.receipt_timezone,
            open_drawer: self.open_cash_drawer,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.work_dir, "./data");
        assert_eq!(config.log_level, "info");
        assert!(config.log_dir.is_none());
        assert!(config.printer_addr.is_none());
        assert_eq!(config.printer_simulation, SimulationProfile::Flaky);
        assert_eq!(config.paper_width, 48);
        assert_eq!(config.queue_store, QueueStoreKind::Memory);
        assert_eq!(config.receipt_timezone, Tz::UTC);
        assert_eq!(config.low_paper_threshold, 20);
        assert!(!config.open_cash_drawer);
        assert_eq!(config.write_timeout(), Duration::from_secs(10));
        assert_eq!(config.monitor_config().interval, Duration::from_secs(30));
        assert_eq!(config.monitor_config().timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PRINTER_ADDR", "192.168.1.50:9100"),
            ("PAPER_WIDTH", "32"),
            ("QUEUE_STORE", "REDB"),
            ("RECEIPT_TIMEZONE", "Africa/Accra"),
            ("OPEN_CASH_DRAWER", "true"),
            ("PRINTER_SIMULATION", "reliable"),
            ("WORK_DIR", "/tmp/receipts"),
        ]);
        assert_eq!(config.printer_addr.as_deref(), Some("192.168.1.50:9100"));
        assert_eq!(config.paper_width, 32);
        assert_eq!(config.queue_store, QueueStoreKind::Redb);
        assert_eq!(config.receipt_timezone, chrono_tz::Africa::Accra);
        assert_eq!(config.printer_simulation, SimulationProfile::Reliable);
        assert_eq!(
            config.queue_db_path(),
            PathBuf::from("/tmp/receipts/print_queue.redb")
        );

        let layout = config.receipt_layout();
        assert_eq!(layout.width, 32);
        assert!(layout.open_drawer);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config(&[
            ("PAPER_WIDTH", "wide"),
            ("STATUS_POLL_INTERVAL_SECS", "0"),
            ("QUEUE_STORE", "postgres"),
            ("RECEIPT_TIMEZONE", "Mars/Olympus"),
            ("LOW_PAPER_THRESHOLD", "300"),
        ]);
        assert_eq!(config.paper_width, 48);
        assert_eq!(config.status_poll_interval_secs, 30);
        assert_eq!(config.queue_store, QueueStoreKind::Memory);
        assert_eq!(config.receipt_timezone, Tz::UTC);
        assert_eq!(config.low_paper_threshold, 20);
    }

    #[test]
    fn test_empty_footer_prints_none() {
        let config = config(&[("RECEIPT_FOOTER", "")]);
        assert!(config.receipt_layout().footer_lines.is_empty());
    }
}
