use receipt_server::{BackgroundTasks, Config, PrintQueue, ServerState, TaskKind};
use receipt_server::{print_banner, setup_environment};
use shared::Transaction;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (.env, work dir, logging)
    dotenv::dotenv().ok();
    let config = Config::from_env();
    setup_environment(&config)?;

    print_banner();
    tracing::info!("Receipt server starting...");

    // 2. Pipeline
    let state = ServerState::initialize(&config)?;

    // 3. Background tasks
    let mut tasks = BackgroundTasks::new();
    state.start_background_tasks(&mut tasks);
    tasks.spawn(
        "stdin_reader",
        TaskKind::Listener,
        read_commands(state.clone(), tasks.shutdown_token()),
    );
    tasks.log_summary();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    if tasks.check_health() > 0 {
        tracing::warn!("Some background tasks stopped before shutdown");
    }

    tasks.shutdown(config.shutdown_timeout()).await;
    Ok(())
}

/// One transaction (JSON) per stdin line, or a `:` command
async fn read_commands(state: ServerState, shutdown: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => return,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) => handle_line(&state, line.trim()).await,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read stdin");
                break;
            }
        }
    }

    tracing::info!("Input closed, waiting for shutdown");
    shutdown.cancelled().await;
}

async fn handle_line(state: &ServerState, line: &str) {
    match line.split_once(' ').unwrap_or((line, "")) {
        ("", _) => {}
        (":status", _) => {
            let status = state.monitor.latest();
            tracing::info!(
                connected = status.connected,
                paper_level = status.paper_level,
                model = %status.model,
                errors = ?status.errors,
                "Printer status"
            );
        }
        (":jobs", _) => log_recent_jobs(&state.queue),
        (":test-page", _) => {
            if let Err(e) = state.processor.print_test_page().await {
                tracing::warn!(error = %e, "Test page not printed");
            }
        }
        (":retry", job_id) => match state.queue.retry(job_id.trim()) {
            Ok(job) => tracing::info!(job_id = %job.id, "Retry enqueued"),
            Err(e) => tracing::warn!(error = %e, "Retry rejected"),
        },
        _ => match serde_json::from_str::<Transaction>(line) {
            Ok(transaction) => {
                if let Err(e) = state.queue.enqueue(&transaction) {
                    tracing::error!(error = %e, "Failed to enqueue transaction");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring malformed transaction"),
        },
    }
}

fn log_recent_jobs(queue: &Arc<PrintQueue>) {
    match queue.recent(10) {
        Ok(jobs) => {
            for job in jobs {
                tracing::info!(
                    job_id = %job.id,
                    transaction_id = %job.transaction_id,
                    client = %job.client_name,
                    amount = job.amount,
                    currency = %job.currency,
                    status = %job.status,
                    reason = job.failure_reason.as_deref().unwrap_or(""),
                    "Job"
                );
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to list jobs"),
    }
}
