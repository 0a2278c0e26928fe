//! redb-based durable storage for print jobs

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use shared::{PrintJob, Transaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::store::{JobStore, StoredJob};

/// Jobs table: key = enqueue sequence, value = JSON StoredJob
const JOBS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("print_jobs");

/// Index: job_id -> enqueue sequence
const JOBS_BY_ID_TABLE: TableDefinition<&str, u64> = TableDefinition::new("print_jobs_by_id");

#[derive(Debug, Error)]
pub enum JobStorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Print job not found: {0}")]
    JobNotFound(String),
}

pub type JobStorageResult<T> = Result<T, JobStorageError>;

/// Durable job store, survives restarts
#[derive(Clone)]
pub struct RedbJobStore {
    db: Arc<Database>,
}

impl RedbJobStore {
    /// Open or create database
    pub fn open(path: impl AsRef<Path>) -> JobStorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> JobStorageResult<Self> {
        let db =
            Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> JobStorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(JOBS_TABLE)?;
            let _ = write_txn.open_table(JOBS_BY_ID_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    fn load(&self, job_id: &str) -> JobStorageResult<Option<StoredJob>> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(JOBS_BY_ID_TABLE)?;
        let data_table = read_txn.open_table(JOBS_TABLE)?;

        let Some(seq) = idx_table.get(job_id)?.map(|guard| guard.value()) else {
            return Ok(None);
        };
        match data_table.get(seq)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }
}

impl JobStore for RedbJobStore {
    fn insert(&self, job: &PrintJob, transaction: &Transaction) -> JobStorageResult<()> {
        let value = serde_json::to_vec(&StoredJob {
            job: job.clone(),
            transaction: transaction.clone(),
        })?;

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(JOBS_TABLE)?;
            // Write transactions are serialized, so last+1 cannot race
            let seq = table.last()?.map(|(key, _)| key.value() + 1).unwrap_or(0);
            table.insert(seq, value.as_slice())?;

            let mut idx_table = txn.open_table(JOBS_BY_ID_TABLE)?;
            idx_table.insert(job.id.as_str(), seq)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn update(&self, job: &PrintJob) -> JobStorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let idx_table = txn.open_table(JOBS_BY_ID_TABLE)?;
            let seq = idx_table
                .get(job.id.as_str())?
                .map(|guard| guard.value())
                .ok_or_else(|| JobStorageError::JobNotFound(job.id.clone()))?;

            let mut table = txn.open_table(JOBS_TABLE)?;
            // Read first
            let bytes = {
                let value = table
                    .get(seq)?
                    .ok_or_else(|| JobStorageError::JobNotFound(job.id.clone()))?;
                value.value().to_vec()
            };

            let mut stored: StoredJob = serde_json::from_slice(&bytes)?;
            stored.job = job.clone();
            let value = serde_json::to_vec(&stored)?;
            table.insert(seq, value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    fn get(&self, job_id: &str) -> JobStorageResult<Option<PrintJob>> {
        Ok(self.load(job_id)?.map(|stored| stored.job))
    }

    fn transaction(&self, job_id: &str) -> JobStorageResult<Option<Transaction>> {
        Ok(self.load(job_id)?.map(|stored| stored.transaction))
    }

    fn list(&self) -> JobStorageResult<Vec<PrintJob>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(JOBS_TABLE)?;

        let mut jobs = Vec::new();
        for result in table.iter()? {
            let (_, guard) = result?;
            let stored: StoredJob = serde_json::from_slice(guard.value())?;
            jobs.push(stored.job);
        }
        Ok(jobs)
    }
}
