//! Shared types for the remittance receipt pipeline
//!
//! Records exchanged between the data layer, the print queue and the UI:
//! transactions, print jobs, job events and printer status snapshots.

pub mod models;

// Re-exports
pub use models::{JobEvent, PrintJob, PrintJobStatus, PrinterStatus, Transaction};
pub use serde::{Deserialize, Serialize};
