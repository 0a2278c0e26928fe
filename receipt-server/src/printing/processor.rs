//! Queue processor
//!
//! Drains pending jobs through the printer one at a time. Per-job failures
//! (printer disconnected, bad transaction data, rejected write) are recorded
//! on the job and never abort the batch.

use chrono::Utc;
use remit_printer::PrinterHandle;
use serde::Serialize;
use shared::{PrintJob, PrintJobStatus};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use super::error::{EncodingError, QueueError, QueueResult, WriteError};
use super::monitor::{COVER_OPEN, PAPER_OUT, StatusReader};
use super::queue::PrintQueue;
use super::renderer::ReceiptEncoder;

const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Recorded when a job's final status could not be stored
const UNRECORDED_REASON: &str = "print outcome not recorded";

/// Outcome counts of one `process_pending` pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Why a single job ended `failed`
#[derive(Debug, Error)]
enum JobFailure {
    #[error("printer disconnected: {0}")]
    Disconnected(String),

    #[error("printer not ready: {0}")]
    NotReady(String),

    #[error("transaction unavailable: {0}")]
    Snapshot(#[source] QueueError),

    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

pub struct QueueProcessor {
    queue: Arc<PrintQueue>,
    printer: Arc<dyn PrinterHandle>,
    status: StatusReader,
    encoder: Arc<dyn ReceiptEncoder>,
    write_timeout: Duration,
    /// Held for every printer write, so one job prints at a time
    print_lock: Mutex<()>,
}

impl QueueProcessor {
    pub fn new(
        queue: Arc<PrintQueue>,
        printer: Arc<dyn PrinterHandle>,
        status: StatusReader,
        encoder: Arc<dyn ReceiptEncoder>,
    ) -> Self {
        Self {
            queue,
            printer,
            status,
            encoder,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            print_lock: Mutex::new(()),
        }
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn queue(&self) -> &Arc<PrintQueue> {
        &self.queue
    }

    /// Print every job that is pending right now, in enqueue order
    ///
    /// Jobs enqueued while this runs are left for the next pass. A job whose
    /// final status cannot be stored is failed instead, and any job an
    /// earlier pass left `printing` is failed before new work starts. `Err`
    /// means the queue contract was broken or the store kept failing.
    pub async fn process_pending(&self) -> QueueResult<ProcessSummary> {
        let _guard = self.print_lock.lock().await;

        // Nothing writes while the lock is held
        let stranded = self.queue.fail_interrupted(UNRECORDED_REASON)?;
        if stranded > 0 {
            warn!(count = stranded, "Failed jobs left printing by an earlier pass");
        }

        let pending = self.queue.jobs_by_status(PrintJobStatus::Pending)?;
        let mut summary = ProcessSummary::default();
        if pending.is_empty() {
            return Ok(summary);
        }

        info!(count = pending.len(), "Processing pending print jobs");
        for job in pending {
            self.queue.update_status(&job.id, PrintJobStatus::Printing)?;

            let recorded = match self.print_job(&job).await {
                Ok(bytes) => self
                    .queue
                    .update_status(&job.id, PrintJobStatus::Completed)
                    .map(|_| {
                        info!(job_id = %job.id, bytes, "Receipt printed");
                        true
                    }),
                Err(failure) => {
                    warn!(job_id = %job.id, error = %failure, "Print job failed");
                    self.queue
                        .mark_failed(&job.id, failure.to_string())
                        .map(|_| false)
                }
            };

            match recorded {
                Ok(true) => summary.succeeded += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    error!(job_id = %job.id, error = %e, "Could not record print outcome");
                    self.queue
                        .mark_failed(&job.id, format!("{UNRECORDED_REASON}: {e}"))?;
                    summary.failed += 1;
                }
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Print queue pass finished"
        );
        Ok(summary)
    }

    /// Print a self-test ticket with the latest printer status
    ///
    /// Goes straight to the printer; no job is created.
    pub async fn print_test_page(&self) -> Result<(), WriteError> {
        let _guard = self.print_lock.lock().await;

        let status = self.status.borrow().clone();
        let data = self.encoder.render_test_page(&status, Utc::now());
        self.write(&data).await.inspect_err(|e| {
            error!(error = %e, "Test page failed");
        })?;
        info!(bytes = data.len(), "Test page printed");
        Ok(())
    }

    /// Returns the number of bytes written
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn print_job(&self, job: &PrintJob) -> Result<usize, JobFailure> {
        // Decide from the latest snapshot; the monitor is not consulted again
        let status = self.status.borrow().clone();
        if !status.connected {
            let detail = if status.errors.is_empty() {
                "no status".to_string()
            } else {
                status.errors.join(", ")
            };
            return Err(JobFailure::Disconnected(detail));
        }
        if let Some(blocking) = status
            .errors
            .iter()
            .find(|e| matches!(e.as_str(), COVER_OPEN | PAPER_OUT))
        {
            return Err(JobFailure::NotReady(blocking.clone()));
        }

        let transaction = self
            .queue
            .transaction(&job.id)
            .map_err(JobFailure::Snapshot)?;
        let data = self.encoder.encode(&transaction, Utc::now())?;
        self.write(&data).await?;
        Ok(data.len())
    }

    async fn write(&self, data: &[u8]) -> Result<(), WriteError> {
        match tokio::time::timeout(self.write_timeout, self.printer.write_bytes(data)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(WriteError::Timeout(self.write_timeout)),
        }
    }
}
