use remit_printer::PrintError;
use thiserror::Error;

use crate::printing::{JobStorageError, QueueError};

/// Startup failures of the receipt server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Work directory error: {0}")]
    WorkDir(#[from] std::io::Error),

    #[error("Printer configuration error: {0}")]
    Printer(#[from] PrintError),

    #[error("Job store error: {0}")]
    Storage(#[from] JobStorageError),

    #[error("Print queue error: {0}")]
    Queue(#[from] QueueError),
}

pub type Result<T> = std::result::Result<T, ServerError>;
