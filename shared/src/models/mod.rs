//! Data models
//!
//! Shared between the printing pipeline and its UI/data-layer callers.

pub mod print_job;
pub mod printer_status;
pub mod transaction;

// Re-exports
pub use print_job::*;
pub use printer_status::*;
pub use transaction::*;
