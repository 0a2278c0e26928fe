//! Printer Status Snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Paper percentage below which operators are warned
pub const LOW_PAPER_THRESHOLD: u8 = 20;

/// Point-in-time printer health
///
/// Replaced wholesale on every poll; never merged field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterStatus {
    pub connected: bool,
    /// 0-100
    pub paper_level: u8,
    pub model: String,
    /// Device units
    pub temperature: i32,
    /// Diagnostics in detection order, empty when healthy
    pub errors: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

impl PrinterStatus {
    /// Disconnected status carrying a single diagnostic
    pub fn disconnected(model: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            connected: false,
            paper_level: 0,
            model: model.into(),
            temperature: 0,
            errors: vec![error.into()],
            checked_at: Utc::now(),
        }
    }

    /// Status before the first poll completes
    pub fn unknown(model: impl Into<String>) -> Self {
        Self::disconnected(model, "status not yet checked")
    }

    /// Low paper is a warning only, printing stays allowed
    pub fn is_paper_low(&self, threshold: u8) -> bool {
        self.paper_level < threshold
    }
}
