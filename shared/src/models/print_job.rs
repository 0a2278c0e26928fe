//! Print Job Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::transaction::Transaction;

/// Print job lifecycle
///
/// `Pending → Printing → Completed | Failed`. Completed and failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintJobStatus {
    Pending,
    Printing,
    Completed,
    Failed,
}

impl PrintJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Printing => "printing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: PrintJobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Printing)
                | (Self::Printing, Self::Completed)
                | (Self::Printing, Self::Failed)
        )
    }
}

impl fmt::Display for PrintJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One receipt waiting for, or done with, the printer
///
/// `client_name`, `amount` and `currency` are copied from the transaction at
/// enqueue time and never follow later edits of the source record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: String,
    pub transaction_id: String,
    pub client_name: String,
    pub amount: f64,
    pub currency: String,
    pub status: PrintJobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Why the job failed, for operator inspection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl PrintJob {
    /// Snapshot a transaction into a new pending job
    pub fn from_transaction(transaction: &Transaction) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            transaction_id: transaction.id.clone(),
            client_name: transaction.client_name.clone(),
            amount: transaction.amount,
            currency: transaction.from_currency.clone(),
            status: PrintJobStatus::Pending,
            created_at: now,
            updated_at: now,
            failure_reason: None,
        }
    }
}

/// Job status change notification for the UI layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: String,
    pub transaction_id: String,
    pub status: PrintJobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

impl JobEvent {
    pub fn from_job(job: &PrintJob) -> Self {
        Self {
            job_id: job.id.clone(),
            transaction_id: job.transaction_id.clone(),
            status: job.status,
            reason: job.failure_reason.clone(),
            at: job.updated_at,
        }
    }
}
