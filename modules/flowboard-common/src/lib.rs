//! Shared types for the flowboard workflow engine.
//!
//! No I/O lives here — just the event model, the kanban projection types,
//! stream-id ordering, configuration, and the error taxonomy.

pub mod board;
pub mod config;
pub mod error;
pub mod events;
pub mod stream_id;

pub use board::{Lane, KanbanBoard, KanbanCard};
pub use config::Config;
pub use error::WorkflowError;
pub use events::{ActionResponse, WorkflowEvent, WorkflowStatus};
pub use stream_id::StreamId;
