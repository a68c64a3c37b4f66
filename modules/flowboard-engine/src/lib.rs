//! Event-stream workflow engine.
//!
//! Everything here speaks to the durable log through the [`EventLog`] trait:
//! the producer appends typed events, the dispatch loop and recovery sweep
//! consume them through a shared consumer group with at-least-once delivery,
//! and the board projector derives the kanban view on demand.

pub mod board;
pub mod dispatch;
pub mod engine;
pub mod handler;
pub mod log;
pub mod memory_log;
pub mod producer;
pub mod recovery;
pub mod redis_log;

pub use board::BoardProjector;
pub use engine::{EngineOptions, WorkflowEngine};
pub use handler::{LoggingSideEffect, SideEffect};
pub use log::{EventLog, GroupInfo, PendingEntry, StreamEntry};
pub use memory_log::MemoryLog;
pub use producer::Producer;
pub use redis_log::RedisLog;
