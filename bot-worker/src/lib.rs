//! Shared contract between the orchestrator and bot workers.
//!
//! This crate defines the substrate-agnostic surface of a bot worker:
//! - The `Orchestrator` capability trait for creating, inspecting, and
//!   terminating workers (container or local process)
//! - Worker handle and state types, plus the normative process exit codes
//! - The closed command/event schema carried over the command bus
//!
//! It performs no I/O of its own; implementations live in the application's
//! domain layer, and the worker runtime consumes the same schema from its
//! side of the bus.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::Error;
pub use traits::orchestrator::Orchestrator;
pub use types::callback::{StatusCallback, WorkerStatus};
pub use types::command::BotCommand;
pub use types::event::BotEvent;
pub use types::worker::{StartRequest, WorkerRef, WorkerState};
