//! Print queue
//!
//! Owns the job list (through a [`JobStore`]) and the job state machine.
//! Every transition is checked against `PrintJobStatus::can_transition_to`,
//! and at most one job may be `printing` at a time.

use chrono::Utc;
use parking_lot::Mutex;
use shared::{JobEvent, PrintJob, PrintJobStatus, Transaction};
use std::sync::Arc;
use tokio::sync::{Notify, broadcast};
use tracing::{debug, info, warn};

use super::error::{QueueError, QueueResult};
use super::store::{JobStore, MemoryJobStore};

/// Job events buffered for slow UI subscribers
const EVENT_CAPACITY: usize = 256;

/// Reason recorded for jobs found `printing` when a durable queue is reopened
const INTERRUPTED_REASON: &str = "interrupted: service stopped while printing";

pub struct PrintQueue {
    store: Arc<dyn JobStore>,
    /// Serializes read-modify-write of job records
    write_lock: Mutex<()>,
    events: broadcast::Sender<JobEvent>,
    enqueued: Notify,
}

impl PrintQueue {
    /// Ephemeral queue backed by memory
    pub fn in_memory() -> Self {
        Self::from_parts(Arc::new(MemoryJobStore::new()))
    }

    /// Queue backed by any store
    ///
    /// Jobs a previous run left in `printing` are failed, since whether the
    /// receipt came out is unknown.
    pub fn with_store(store: Arc<dyn JobStore>) -> QueueResult<Self> {
        let queue = Self::from_parts(store);
        queue.fail_interrupted(INTERRUPTED_REASON)?;
        Ok(queue)
    }

    /// Fail every job left `printing`, returning how many were failed
    ///
    /// Only safe while nothing is writing to the printer.
    pub fn fail_interrupted(&self, reason: &str) -> QueueResult<usize> {
        let interrupted = self.jobs_by_status(PrintJobStatus::Printing)?;
        for job in &interrupted {
            warn!(job_id = %job.id, reason, "Failing interrupted print job");
            self.mark_failed(&job.id, reason)?;
        }
        Ok(interrupted.len())
    }

    fn from_parts(store: Arc<dyn JobStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            write_lock: Mutex::new(()),
            events,
            enqueued: Notify::new(),
        }
    }

    /// Snapshot a transaction into a new pending job
    ///
    /// No validation happens here; the encoder checks the data when the job
    /// is processed.
    pub fn enqueue(&self, transaction: &Transaction) -> QueueResult<PrintJob> {
        let job = PrintJob::from_transaction(transaction);
        {
            let _guard = self.write_lock.lock();
            self.store.insert(&job, transaction)?;
        }

        info!(
            job_id = %job.id,
            transaction_id = %job.transaction_id,
            "Print job enqueued"
        );
        self.publish(&job);
        self.enqueued.notify_one();
        Ok(job)
    }

    /// Re-enqueue a finished job's transaction as a new pending job
    ///
    /// The original job is left untouched for history.
    pub fn retry(&self, job_id: &str) -> QueueResult<PrintJob> {
        let original = self.get(job_id)?;
        if !original.status.is_terminal() {
            return Err(QueueError::NotRetryable {
                job_id: job_id.to_string(),
                status: original.status,
            });
        }

        let transaction = self.transaction(job_id)?;
        let job = self.enqueue(&transaction)?;
        info!(original = %job_id, job_id = %job.id, "Print job re-enqueued");
        Ok(job)
    }

    pub fn get(&self, job_id: &str) -> QueueResult<PrintJob> {
        self.store
            .get(job_id)?
            .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))
    }

    /// Transaction snapshot the job will print
    pub fn transaction(&self, job_id: &str) -> QueueResult<Transaction> {
        self.store
            .transaction(job_id)?
            .ok_or_else(|| QueueError::MissingTransaction(job_id.to_string()))
    }

    /// All jobs in enqueue order
    pub fn jobs(&self) -> QueueResult<Vec<PrintJob>> {
        Ok(self.store.list()?)
    }

    /// Jobs with the given status, in enqueue order
    pub fn jobs_by_status(&self, status: PrintJobStatus) -> QueueResult<Vec<PrintJob>> {
        Ok(self
            .store
            .list()?
            .into_iter()
            .filter(|job| job.status == status)
            .collect())
    }

    /// Most recent jobs first, at most `limit`
    pub fn recent(&self, limit: usize) -> QueueResult<Vec<PrintJob>> {
        Ok(self.store.list()?.into_iter().rev().take(limit).collect())
    }

    /// Move a job along the state machine
    ///
    /// Illegal transitions are caller bugs and return an error with the job
    /// left unchanged.
    pub fn update_status(&self, job_id: &str, status: PrintJobStatus) -> QueueResult<PrintJob> {
        self.transition(job_id, status, None)
    }

    /// Fail a `printing` job, recording why
    pub fn mark_failed(&self, job_id: &str, reason: impl Into<String>) -> QueueResult<PrintJob> {
        self.transition(job_id, PrintJobStatus::Failed, Some(reason.into()))
    }

    /// Subscribe to job events (enqueue and every transition)
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Resolves once a job has been enqueued since the last call
    pub async fn wait_for_jobs(&self) {
        self.enqueued.notified().await;
    }

    fn transition(
        &self,
        job_id: &str,
        next: PrintJobStatus,
        reason: Option<String>,
    ) -> QueueResult<PrintJob> {
        let job = {
            let _guard = self.write_lock.lock();

            let mut job = self.get(job_id)?;
            if !job.status.can_transition_to(next) {
                return Err(QueueError::IllegalTransition {
                    job_id: job_id.to_string(),
                    from: job.status,
                    to: next,
                });
            }

            if next == PrintJobStatus::Printing
                && let Some(busy) = self
                    .store
                    .list()?
                    .into_iter()
                    .find(|other| other.status == PrintJobStatus::Printing)
            {
                return Err(QueueError::PrinterBusy {
                    requested: job_id.to_string(),
                    printing: busy.id,
                });
            }

            job.status = next;
            job.updated_at = Utc::now();
            if reason.is_some() {
                job.failure_reason = reason;
            }
            self.store.update(&job)?;
            job
        };

        debug!(job_id = %job.id, status = %job.status, "Print job status changed");
        self.publish(&job);
        Ok(job)
    }

    fn publish(&self, job: &PrintJob) {
        // No subscribers is fine
        let _ = self.events.send(JobEvent::from_job(job));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printing::storage::RedbJobStore;
    use crate::printing::store::test_support::transaction;

    #[test]
    fn test_enqueue_snapshots_transaction() {
        let queue = PrintQueue::in_memory();
        let mut tx = transaction("t-1", 100.0, "GHS");

        let job = queue.enqueue(&tx).unwrap();
        assert_eq!(job.status, PrintJobStatus::Pending);
        assert_eq!(job.transaction_id, "t-1");
        assert_eq!(job.client_name, "Efua Owusu");
        assert_eq!(job.amount, 100.0);
        assert_eq!(job.currency, "USD");

        // Later edits of the source record do not leak into the job
        tx.client_name = "Someone Else".to_string();
        tx.amount = 999.0;
        let stored = queue.get(&job.id).unwrap();
        assert_eq!(stored.client_name, "Efua Owusu");
        assert_eq!(stored.amount, 100.0);
        assert_eq!(queue.transaction(&job.id).unwrap().amount, 100.0);
    }

    #[test]
    fn test_legal_lifecycle() {
        let queue = PrintQueue::in_memory();
        let job = queue.enqueue(&transaction("t-1", 100.0, "GHS")).unwrap();

        queue.update_status(&job.id, PrintJobStatus::Printing).unwrap();
        let done = queue
            .update_status(&job.id, PrintJobStatus::Completed)
            .unwrap();
        assert_eq!(done.status, PrintJobStatus::Completed);
    }

    #[test]
    fn test_cannot_skip_printing() {
        let queue = PrintQueue::in_memory();
        let job = queue.enqueue(&transaction("t-1", 100.0, "GHS")).unwrap();

        for target in [PrintJobStatus::Completed, PrintJobStatus::Failed] {
            let err = queue.update_status(&job.id, target).unwrap_err();
            assert!(matches!(err, QueueError::IllegalTransition { .. }));
        }
        assert_eq!(queue.get(&job.id).unwrap().status, PrintJobStatus::Pending);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let queue = PrintQueue::in_memory();
        let completed = queue.enqueue(&transaction("t-1", 100.0, "GHS")).unwrap();
        let failed = queue.enqueue(&transaction("t-2", 100.0, "GHS")).unwrap();

        queue.update_status(&completed.id, PrintJobStatus::Printing).unwrap();
        queue.update_status(&completed.id, PrintJobStatus::Completed).unwrap();
        queue.update_status(&failed.id, PrintJobStatus::Printing).unwrap();
        queue.mark_failed(&failed.id, "paper out").unwrap();

        let all = [
            PrintJobStatus::Pending,
            PrintJobStatus::Printing,
            PrintJobStatus::Completed,
            PrintJobStatus::Failed,
        ];
        for (job_id, terminal) in [
            (&completed.id, PrintJobStatus::Completed),
            (&failed.id, PrintJobStatus::Failed),
        ] {
            for target in all {
                let err = queue.update_status(job_id, target).unwrap_err();
                assert!(matches!(
                    err,
                    QueueError::IllegalTransition { from, to, .. } if from == terminal && to == target
                ));
                assert_eq!(queue.get(job_id).unwrap().status, terminal);
            }
        }
        assert_eq!(
            queue.get(&failed.id).unwrap().failure_reason.as_deref(),
            Some("paper out")
        );
    }

    #[test]
    fn test_only_one_job_printing() {
        let queue = PrintQueue::in_memory();
        let first = queue.enqueue(&transaction("t-1", 100.0, "GHS")).unwrap();
        let second = queue.enqueue(&transaction("t-2", 100.0, "GHS")).unwrap();

        queue.update_status(&first.id, PrintJobStatus::Printing).unwrap();
        let err = queue
            .update_status(&second.id, PrintJobStatus::Printing)
            .unwrap_err();
        assert!(matches!(err, QueueError::PrinterBusy { ref printing, .. } if *printing == first.id));
        assert_eq!(queue.get(&second.id).unwrap().status, PrintJobStatus::Pending);

        queue.update_status(&first.id, PrintJobStatus::Completed).unwrap();
        queue.update_status(&second.id, PrintJobStatus::Printing).unwrap();
    }

    #[test]
    fn test_unknown_job() {
        let queue = PrintQueue::in_memory();
        assert!(matches!(
            queue.update_status("nope", PrintJobStatus::Printing),
            Err(QueueError::JobNotFound(_))
        ));
    }

    #[test]
    fn test_jobs_by_status_is_read_only() {
        let queue = PrintQueue::in_memory();
        for id in ["t-1", "t-2", "t-3"] {
            queue.enqueue(&transaction(id, 10.0, "GHS")).unwrap();
        }
        let before = queue.jobs().unwrap();

        let first = queue.jobs_by_status(PrintJobStatus::Pending).unwrap();
        let second = queue.jobs_by_status(PrintJobStatus::Pending).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, before);
        assert_eq!(queue.jobs().unwrap(), before);
    }

    #[test]
    fn test_recent_newest_first() {
        let queue = PrintQueue::in_memory();
        for id in ["t-1", "t-2", "t-3"] {
            queue.enqueue(&transaction(id, 10.0, "GHS")).unwrap();
        }

        let recent: Vec<_> = queue
            .recent(2)
            .unwrap()
            .into_iter()
            .map(|j| j.transaction_id)
            .collect();
        assert_eq!(recent, vec!["t-3", "t-2"]);
    }

    #[test]
    fn test_retry_failed_job() {
        let queue = PrintQueue::in_memory();
        let job = queue.enqueue(&transaction("t-1", 100.0, "GHS")).unwrap();

        assert!(matches!(
            queue.retry(&job.id),
            Err(QueueError::NotRetryable { .. })
        ));

        queue.update_status(&job.id, PrintJobStatus::Printing).unwrap();
        queue.mark_failed(&job.id, "printer disconnected").unwrap();

        let retried = queue.retry(&job.id).unwrap();
        assert_ne!(retried.id, job.id);
        assert_eq!(retried.transaction_id, "t-1");
        assert_eq!(retried.status, PrintJobStatus::Pending);
        assert_eq!(queue.get(&job.id).unwrap().status, PrintJobStatus::Failed);
        assert_eq!(queue.jobs().unwrap().len(), 2);
    }

    #[test]
    fn test_events_follow_lifecycle() {
        let queue = PrintQueue::in_memory();
        let mut events = queue.subscribe();

        let job = queue.enqueue(&transaction("t-1", 100.0, "GHS")).unwrap();
        queue.update_status(&job.id, PrintJobStatus::Printing).unwrap();
        queue.mark_failed(&job.id, "write timed out").unwrap();

        let statuses: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| (e.status, e.reason))
            .collect();
        assert_eq!(
            statuses,
            vec![
                (PrintJobStatus::Pending, None),
                (PrintJobStatus::Printing, None),
                (PrintJobStatus::Failed, Some("write timed out".to_string())),
            ]
        );
    }

    #[test]
    fn test_reopen_fails_interrupted_jobs() {
        let store = Arc::new(RedbJobStore::open_in_memory().unwrap());

        let (printing_id, pending_id) = {
            let queue = PrintQueue::with_store(store.clone()).unwrap();
            let printing = queue.enqueue(&transaction("t-1", 100.0, "GHS")).unwrap();
            let pending = queue.enqueue(&transaction("t-2", 100.0, "GHS")).unwrap();
            queue.update_status(&printing.id, PrintJobStatus::Printing).unwrap();
            (printing.id, pending.id)
        };

        let queue = PrintQueue::with_store(store).unwrap();
        let interrupted = queue.get(&printing_id).unwrap();
        assert_eq!(interrupted.status, PrintJobStatus::Failed);
        assert_eq!(interrupted.failure_reason.as_deref(), Some(INTERRUPTED_REASON));
        assert_eq!(queue.get(&pending_id).unwrap().status, PrintJobStatus::Pending);
    }

    #[test]
    fn test_fail_interrupted_frees_printer() {
        let queue = PrintQueue::in_memory();
        let stuck = queue.enqueue(&transaction("t-1", 100.0, "GHS")).unwrap();
        let next = queue.enqueue(&transaction("t-2", 100.0, "GHS")).unwrap();
        queue.update_status(&stuck.id, PrintJobStatus::Printing).unwrap();

        assert_eq!(queue.fail_interrupted("lost").unwrap(), 1);
        assert_eq!(queue.get(&stuck.id).unwrap().status, PrintJobStatus::Failed);
        queue.update_status(&next.id, PrintJobStatus::Printing).unwrap();
        assert_eq!(queue.fail_interrupted("lost").unwrap(), 1);
        assert_eq!(queue.fail_interrupted("lost").unwrap(), 0);
    }
}
