//! Receipt print worker
//!
//! Runs the queue processor whenever a job is enqueued, plus a periodic sweep
//! that catches anything a wakeup missed.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::processor::QueueProcessor;

pub struct PrintWorker {
    processor: Arc<QueueProcessor>,
    sweep_interval: Duration,
}

impl PrintWorker {
    pub fn new(processor: Arc<QueueProcessor>, sweep_interval: Duration) -> Self {
        Self {
            processor,
            sweep_interval,
        }
    }

    /// Run until shutdown is signalled
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            sweep_secs = self.sweep_interval.as_secs(),
            "Receipt print worker started"
        );
        let queue = self.processor.queue().clone();

        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Receipt print worker received shutdown signal");
                    break;
                }
                _ = queue.wait_for_jobs() => {}
                _ = sweep.tick() => {}
            }
            self.drain().await;
        }
    }

    async fn drain(&self) {
        if let Err(e) = self.processor.process_pending().await {
            tracing::error!(error = %e, "Print queue pass aborted");
        }
    }
}
