//! Receipt Printing Module
//!
//! Turns remittance transactions into printed receipts:
//! - Encoding: transaction → ESC/POS bytes (`renderer`)
//! - Queueing: job state machine over a pluggable store (`queue`, `store`, `storage`)
//! - Monitoring: periodic printer health snapshots (`monitor`)
//! - Processing: draining pending jobs through the printer (`processor`, `worker`)

pub mod error;
pub mod monitor;
pub mod processor;
pub mod queue;
pub mod renderer;
pub mod storage;
pub mod store;
pub mod worker;

pub use error::{ConnectionError, EncodingError, QueueError, QueueResult, WriteError};
pub use monitor::{ConnectionState, MonitorConfig, PrinterMonitor, StatusReader};
pub use processor::{ProcessSummary, QueueProcessor};
pub use queue::PrintQueue;
pub use renderer::{ReceiptEncoder, ReceiptLayout, ReceiptRenderer, format_grouped};
pub use storage::{JobStorageError, JobStorageResult, RedbJobStore};
pub use store::{JobStore, MemoryJobStore, StoredJob};
pub use worker::PrintWorker;
