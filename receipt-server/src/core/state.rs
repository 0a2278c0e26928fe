use remit_printer::{NetworkPrinter, PrinterHandle, SimulatedPrinter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::config::{Config, QueueStoreKind};
use super::error::Result;
use super::tasks::{BackgroundTasks, TaskKind};
use crate::printing::{
    JobStore, MemoryJobStore, PrintQueue, PrintWorker, PrinterMonitor, QueueProcessor,
    ReceiptRenderer, RedbJobStore,
};

/// Shared handles of the running pipeline
///
/// Cheap to clone; every field is reference counted.
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub printer: Arc<dyn PrinterHandle>,
    pub queue: Arc<PrintQueue>,
    pub monitor: Arc<PrinterMonitor>,
    pub processor: Arc<QueueProcessor>,
}

impl ServerState {
    /// Build the pipeline from configuration
    ///
    /// Opens the job store (failing jobs a crash left printing), connects
    /// the printer handle and wires the monitor snapshot into the processor.
    pub fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        let printer = build_printer(config)?;

        let store: Arc<dyn JobStore> = match config.queue_store {
            QueueStoreKind::Memory => Arc::new(MemoryJobStore::new()),
            QueueStoreKind::Redb => {
                let path = config.queue_db_path();
                tracing::info!(path = %path.display(), "Opening durable print queue");
                Arc::new(RedbJobStore::open(path)?)
            }
        };
        let queue = Arc::new(PrintQueue::with_store(store)?);

        let monitor = Arc::new(PrinterMonitor::new(
            printer.clone(),
            config.monitor_config(),
        ));
        let processor = Arc::new(
            QueueProcessor::new(
                queue.clone(),
                printer.clone(),
                monitor.subscribe(),
                Arc::new(ReceiptRenderer::new(config.receipt_layout())),
            )
            .with_write_timeout(config.write_timeout()),
        );

        Ok(Self {
            config: config.clone(),
            printer,
            queue,
            monitor,
            processor,
        })
    }

    /// Start the monitor, the print worker and the job event log
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        let token = tasks.shutdown_token();

        tasks.spawn(
            "printer_monitor",
            TaskKind::Periodic,
            self.monitor.clone().run(token.clone()),
        );

        let worker = PrintWorker::new(self.processor.clone(), self.config.sweep_interval());
        tasks.spawn("print_worker", TaskKind::Worker, worker.run(token.clone()));

        tasks.spawn(
            "job_event_log",
            TaskKind::Listener,
            log_job_events(self.queue.clone(), token),
        );
    }
}

fn build_printer(config: &Config) -> Result<Arc<dyn PrinterHandle>> {
    match &config.printer_addr {
        Some(addr) => {
            let printer = NetworkPrinter::from_addr(addr)?
                .with_timeout(Duration::from_millis(config.status_poll_timeout_ms))
                .with_model(config.printer_model.clone());
            tracing::info!(addr = %printer.addr(), "Using network printer");
            Ok(Arc::new(printer))
        }
        None => {
            tracing::info!(
                model = %config.printer_model,
                profile = ?config.printer_simulation,
                "No printer address configured, using simulated printer"
            );
            Ok(Arc::new(
                SimulatedPrinter::new(config.printer_model.clone())
                    .with_behavior(config.printer_simulation.behavior()),
            ))
        }
    }
}

async fn log_job_events(queue: Arc<PrintQueue>, shutdown: CancellationToken) {
    let mut events = queue.subscribe();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Ok(event) => match &event.reason {
                    Some(reason) => tracing::info!(
                        job_id = %event.job_id,
                        transaction_id = %event.transaction_id,
                        status = %event.status,
                        reason = %reason,
                        "Job event"
                    ),
                    None => tracing::info!(
                        job_id = %event.job_id,
                        transaction_id = %event.transaction_id,
                        status = %event.status,
                        "Job event"
                    ),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Job event log lagging");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationProfile;
    use shared::PrintJobStatus;

    fn test_config(work_dir: &std::path::Path, store: QueueStoreKind) -> Config {
        let mut config = Config::from_lookup(|_| None);
        config.work_dir = work_dir.to_string_lossy().into_owned();
        config.queue_store = store;
        config.printer_simulation = SimulationProfile::Reliable;
        config
    }

    #[tokio::test]
    async fn test_initialize_with_simulated_printer() {
        let dir = tempfile::tempdir().unwrap();
        let state = ServerState::initialize(&test_config(dir.path(), QueueStoreKind::Memory)).unwrap();

        assert!(state.monitor.poll().await.connected);
        state
            .queue
            .enqueue(&crate::printing::store::test_support::transaction("t-1", 100.0, "GHS"))
            .unwrap();
        let summary = state.processor.process_pending().await.unwrap();
        assert_eq!(summary.succeeded, 1);
    }

    #[tokio::test]
    async fn test_redb_queue_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), QueueStoreKind::Redb);

        let job_id = {
            let state = ServerState::initialize(&config).unwrap();
            let job = state
                .queue
                .enqueue(&crate::printing::store::test_support::transaction("t-1", 100.0, "GHS"))
                .unwrap();
            job.id
        };

        let state = ServerState::initialize(&config).unwrap();
        assert_eq!(state.queue.get(&job_id).unwrap().status, PrintJobStatus::Pending);
    }

    #[tokio::test]
    async fn test_invalid_printer_addr() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path(), QueueStoreKind::Memory);
        config.printer_addr = Some("not an address".to_string());

        assert!(ServerState::initialize(&config).is_err());
    }
}
