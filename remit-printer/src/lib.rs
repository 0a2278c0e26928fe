//! # remit-printer
//!
//! ESC/POS thermal printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS command building (text, alignment, CODE128 barcodes, cut, drawer)
//! - Windows-1252 text conversion for Latin receipts
//! - Network printing (TCP port 9100) with DLE EOT status queries
//! - A simulated printer for development and tests
//!
//! Business logic (WHAT to print) stays in application code:
//! - Remittance receipt rendering and the print queue → receipt-server
//!
//! ## Example
//!
//! ```ignore
//! use remit_printer::{EscPosBuilder, NetworkPrinter, PrinterHandle};
//!
//! let mut builder = EscPosBuilder::new(48);
//! builder.center();
//! builder.double_size();
//! builder.line("RECEIPT");
//! builder.reset_size();
//! builder.sep_double();
//! builder.left();
//! builder.line_lr("Amount", "1,250.00 USD");
//! builder.cut();
//!
//! let printer = NetworkPrinter::new("192.168.1.100", 9100)?;
//! printer.write_bytes(&builder.build()).await?;
//! ```

mod encoding;
mod error;
mod escpos;
mod printer;
mod simulated;

// Re-exports
pub use encoding::{CODE_TABLE_WPC1252, encode_text};
pub use error::{PrintError, PrintResult};
pub use escpos::{CUT_FULL, DRAWER_PULSE, EscPosBuilder, INIT};
pub use printer::{NetworkPrinter, PrinterHandle, RawStatus, parse_realtime_status};
pub use simulated::{SimulatedBehavior, SimulatedPrinter};
