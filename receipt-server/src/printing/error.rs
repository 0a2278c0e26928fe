//! Printing pipeline error taxonomy

use remit_printer::PrintError;
use shared::PrintJobStatus;
use std::time::Duration;
use thiserror::Error;

use super::storage::JobStorageError;

/// Transaction data cannot be rendered into an ESC/POS stream
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("amount must not be negative, got {0}")]
    NegativeAmount(f64),

    #[error("invalid currency code: {0:?}")]
    InvalidCurrency(String),

    #[error("receipt id is empty")]
    EmptyId,

    #[error("receipt id is {len} bytes, the barcode length prefix allows at most 255")]
    IdTooLong { len: usize },

    #[error("receipt id must be printable ASCII")]
    NonAsciiId,

    #[error("barcode rejected: {0}")]
    Barcode(#[source] PrintError),
}

/// Printer could not be reached while polling its status
///
/// Never leaves the monitor: it becomes a disconnected `PrinterStatus`.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection timeout")]
    Timeout(Duration),

    #[error(transparent)]
    Device(#[from] PrintError),
}

/// Printer rejected or timed out on a receipt write
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("write timed out after {0:?}")]
    Timeout(Duration),

    #[error("printer rejected write: {0}")]
    Device(#[from] PrintError),
}

/// Print queue contract violations and storage failures
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Print job not found: {0}")]
    JobNotFound(String),

    #[error("Illegal transition for job {job_id}: {from} -> {to}")]
    IllegalTransition {
        job_id: String,
        from: PrintJobStatus,
        to: PrintJobStatus,
    },

    #[error("Job {requested} cannot start printing while job {printing} is printing")]
    PrinterBusy { requested: String, printing: String },

    #[error("Job {job_id} is {status} and cannot be retried")]
    NotRetryable {
        job_id: String,
        status: PrintJobStatus,
    },

    #[error("Transaction snapshot missing for job {0}")]
    MissingTransaction(String),

    #[error("Storage error: {0}")]
    Storage(#[from] JobStorageError),
}

pub type QueueResult<T> = Result<T, QueueError>;
