//! Remittance receipt server
//!
//! Prints transaction receipts on an ESC/POS thermal printer.
//!
//! # Module layout
//!
//! ```text
//! receipt-server/src/
//! ├── core/       # config, state, background tasks, errors
//! ├── printing/   # encoder, queue, monitor, processor, worker
//! └── utils/      # logging
//! ```

pub mod core;
pub mod printing;
pub mod utils;

pub use core::{BackgroundTasks, Config, ServerError, ServerState, TaskKind};
pub use printing::{PrintQueue, PrinterMonitor, ProcessSummary, QueueProcessor};
pub use utils::logger::init_logger_with_file;

/// Prepare the process: work directory and logging
///
/// Call after loading `.env` and before anything logs.
pub fn setup_environment(config: &Config) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.work_dir)?;
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ____                _       __
   / __ \___  ________ (_)___  / /_
  / /_/ / _ \/ ___/ _ \/ / __ \/ __/
 / _, _/  __/ /__/  __/ / /_/ / /_
/_/ |_|\___/\___/\___/_/ .___/\__/
                      /_/
    "#
    );
}
