//! Printer connection monitor
//!
//! Polls the printer on an interval and publishes one [`PrinterStatus`]
//! snapshot per poll through a `watch` channel. Readers always see the
//! latest complete snapshot, never a half-updated one.

use chrono::Utc;
use remit_printer::{PrinterHandle, RawStatus};
use shared::PrinterStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::error::ConnectionError;

/// Status error entries, in the order they are reported
const PRINTER_OFFLINE: &str = "printer offline";
pub(crate) const COVER_OPEN: &str = "cover open";
pub(crate) const PAPER_OUT: &str = "paper out";

/// Read side of the monitor
pub type StatusReader = watch::Receiver<PrinterStatus>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Checking,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
    /// Upper bound on a single status query
    pub timeout: Duration,
    pub low_paper_threshold: u8,
    /// Model reported when the printer does not say
    pub model_hint: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(3),
            low_paper_threshold: shared::models::LOW_PAPER_THRESHOLD,
            model_hint: "Unknown".to_string(),
        }
    }
}

pub struct PrinterMonitor {
    printer: Arc<dyn PrinterHandle>,
    config: MonitorConfig,
    status_tx: watch::Sender<PrinterStatus>,
    state_tx: watch::Sender<ConnectionState>,
}

impl PrinterMonitor {
    pub fn new(printer: Arc<dyn PrinterHandle>, config: MonitorConfig) -> Self {
        let (status_tx, _) = watch::channel(PrinterStatus::unknown(config.model_hint.clone()));
        let (state_tx, _) = watch::channel(ConnectionState::Checking);
        Self {
            printer,
            config,
            status_tx,
            state_tx,
        }
    }

    pub fn subscribe(&self) -> StatusReader {
        self.status_tx.subscribe()
    }

    pub fn latest(&self) -> PrinterStatus {
        self.status_tx.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Query the printer once and publish the result
    ///
    /// Never fails: unreachable printers produce a disconnected status.
    pub async fn poll(&self) -> PrinterStatus {
        self.state_tx.send_replace(ConnectionState::Checking);

        let status = match self.query().await {
            Ok(raw) => self.interpret(raw),
            Err(e) => {
                tracing::warn!(error = %e, "Printer status check failed");
                PrinterStatus::disconnected(self.config.model_hint.clone(), e.to_string())
            }
        };

        if status.connected && status.is_paper_low(self.config.low_paper_threshold) {
            tracing::warn!(paper_level = status.paper_level, "Printer paper low");
        }

        let state = if status.connected {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        let previous = self.status_tx.send_replace(status.clone());
        self.state_tx.send_replace(state);

        if previous.connected != status.connected {
            tracing::info!(
                connected = status.connected,
                model = %status.model,
                "Printer connection changed"
            );
        }

        status
    }

    /// Poll on the configured interval until cancelled
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            "Printer monitor started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Printer monitor received shutdown signal");
                    break;
                }
                // First tick fires immediately
                _ = ticker.tick() => {
                    self.poll().await;
                }
            }
        }
    }

    async fn query(&self) -> Result<RawStatus, ConnectionError> {
        match tokio::time::timeout(self.config.timeout, self.printer.query_status()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ConnectionError::Timeout(self.config.timeout)),
        }
    }

    fn interpret(&self, raw: RawStatus) -> PrinterStatus {
        let mut errors = Vec::new();
        if !raw.online {
            errors.push(PRINTER_OFFLINE.to_string());
        }
        if raw.cover_open {
            errors.push(COVER_OPEN.to_string());
        }
        if raw.paper_out {
            errors.push(PAPER_OUT.to_string());
        }

        // Real printers only report thresholds, not a level
        let paper_level = raw.paper_level.map(|p| p.min(100)).unwrap_or(if raw.paper_out {
            0
        } else if raw.paper_near_end {
            10
        } else {
            100
        });

        PrinterStatus {
            connected: raw.online,
            paper_level,
            model: raw.model.unwrap_or_else(|| self.config.model_hint.clone()),
            temperature: raw.temperature.unwrap_or(0),
            errors,
            checked_at: Utc::now(),
        }
    }
}
