//! Print job store boundary
//!
//! The queue only talks to [`JobStore`], so the ephemeral in-memory list can
//! be swapped for a durable store without touching the queue processor.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared::{PrintJob, Transaction};
use std::collections::HashMap;

use super::storage::{JobStorageError, JobStorageResult};

/// A job together with the transaction snapshot it will print
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredJob {
    pub job: PrintJob,
    pub transaction: Transaction,
}

/// Ordered job storage
///
/// Implementations keep jobs in insertion (enqueue) order and never delete
/// them on their own.
pub trait JobStore: Send + Sync {
    /// Append a new job
    fn insert(&self, job: &PrintJob, transaction: &Transaction) -> JobStorageResult<()>;

    /// Replace an existing job record
    fn update(&self, job: &PrintJob) -> JobStorageResult<()>;

    fn get(&self, job_id: &str) -> JobStorageResult<Option<PrintJob>>;

    /// Transaction snapshot captured at enqueue time
    fn transaction(&self, job_id: &str) -> JobStorageResult<Option<Transaction>>;

    /// All jobs in enqueue order
    fn list(&self) -> JobStorageResult<Vec<PrintJob>>;
}

#[derive(Default)]
struct MemoryInner {
    entries: Vec<StoredJob>,
    index: HashMap<String, usize>,
}

/// Ephemeral job store (lost on restart)
#[derive(Default)]
pub struct MemoryJobStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    fn insert(&self, job: &PrintJob, transaction: &Transaction) -> JobStorageResult<()> {
        let mut inner = self.inner.write();
        let pos = inner.entries.len();
        inner.index.insert(job.id.clone(), pos);
        inner.entries.push(StoredJob {
            job: job.clone(),
            transaction: transaction.clone(),
        });
        Ok(())
    }

    fn update(&self, job: &PrintJob) -> JobStorageResult<()> {
        let mut inner = self.inner.write();
        let pos = *inner
            .index
            .get(&job.id)
            .ok_or_else(|| JobStorageError::JobNotFound(job.id.clone()))?;
        inner.entries[pos].job = job.clone();
        Ok(())
    }

    fn get(&self, job_id: &str) -> JobStorageResult<Option<PrintJob>> {
        let inner = self.inner.read();
        Ok(inner
            .index
            .get(job_id)
            .map(|&pos| inner.entries[pos].job.clone()))
    }

    fn transaction(&self, job_id: &str) -> JobStorageResult<Option<Transaction>> {
        let inner = self.inner.read();
        Ok(inner
            .index
            .get(job_id)
            .map(|&pos| inner.entries[pos].transaction.clone()))
    }

    fn list(&self) -> JobStorageResult<Vec<PrintJob>> {
        Ok(self
            .inner
            .read()
            .entries
            .iter()
            .map(|entry| entry.job.clone())
            .collect())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::transaction;
    use super::*;
    use shared::PrintJobStatus;

    #[test]
    fn test_memory_store_keeps_order() {
        let store = MemoryJobStore::new();
        let ids: Vec<String> = ["a", "b", "c"]
            .iter()
            .map(|id| {
                let tx = transaction(id, 10.0, "GHS");
                let job = PrintJob::from_transaction(&tx);
                store.insert(&job, &tx).unwrap();
                job.id
            })
            .collect();

        let listed: Vec<String> = store.list().unwrap().into_iter().map(|j| j.id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn test_memory_store_update() {
        let store = MemoryJobStore::new();
        let tx = transaction("a", 10.0, "GHS");
        let mut job = PrintJob::from_transaction(&tx);
        store.insert(&job, &tx).unwrap();

        job.status = PrintJobStatus::Printing;
        store.update(&job).unwrap();

        assert_eq!(
            store.get(&job.id).unwrap().unwrap().status,
            PrintJobStatus::Printing
        );
        assert_eq!(store.transaction(&job.id).unwrap().unwrap(), tx);
    }

    #[test]
    fn test_memory_store_update_unknown() {
        let store = MemoryJobStore::new();
        let tx = transaction("a", 10.0, "GHS");
        let job = PrintJob::from_transaction(&tx);

        assert!(matches!(
            store.update(&job),
            Err(JobStorageError::JobNotFound(_))
        ));
    }
}
