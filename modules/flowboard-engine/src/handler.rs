//! Side-effect seam for delivered workflow events.
//!
//! Handlers run between delivery and ack, so they execute at least once per
//! event and must tolerate duplicates. The default implementation stands in
//! for the real business actions (manager notification, document
//! generation) and just logs.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use flowboard_common::WorkflowEvent;

/// Business action executed for each delivered event.
#[async_trait]
pub trait SideEffect: Send + Sync {
    async fn handle(&self, event: &WorkflowEvent) -> Result<()>;
}

/// Stub handler: logs the action and optionally simulates work.
pub struct LoggingSideEffect {
    work_delay: Duration,
}

impl LoggingSideEffect {
    pub fn new(work_delay: Duration) -> Self {
        Self { work_delay }
    }
}

impl Default for LoggingSideEffect {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[async_trait]
impl SideEffect for LoggingSideEffect {
    async fn handle(&self, event: &WorkflowEvent) -> Result<()> {
        if !self.work_delay.is_zero() {
            tokio::time::sleep(self.work_delay).await;
        }
        match event {
            WorkflowEvent::DocumentSubmitted { doc_id, user_id, .. } => {
                info!(doc_id = %doc_id, user_id = %user_id, "Notifying manager of submission");
            }
            WorkflowEvent::DocumentApproved {
                doc_id,
                approver_id,
                ..
            } => {
                info!(doc_id = %doc_id, approver_id = %approver_id, "Generating approval document");
            }
        }
        Ok(())
    }
}
