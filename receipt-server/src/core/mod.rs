//! Core module: configuration, server state, background tasks and errors
//!
//! - [`Config`] - environment driven configuration
//! - [`ServerState`] - shared pipeline handles
//! - [`BackgroundTasks`] - task lifecycle
//! - [`ServerError`] - startup errors

pub mod config;
pub mod error;
pub mod state;
pub mod tasks;

pub use config::{Config, QueueStoreKind, SimulationProfile};
pub use error::{Result, ServerError};
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};
