//! Appends workflow events to the log.

use std::sync::Arc;

use tracing::info;

use flowboard_common::{ActionResponse, WorkflowError, WorkflowEvent};

use crate::log::EventLog;

/// Producer half of the engine. Append-only; never touches group state.
#[derive(Clone)]
pub struct Producer {
    log: Arc<dyn EventLog>,
}

impl Producer {
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self { log }
    }

    /// Append a submission event. The returned id is the log-assigned one.
    pub async fn submit_document(
        &self,
        doc_id: &str,
        user_id: &str,
    ) -> Result<ActionResponse, WorkflowError> {
        self.append(WorkflowEvent::submitted(doc_id, user_id)).await
    }

    /// Append an approval event. No cross-check against prior submissions.
    pub async fn approve_document(
        &self,
        doc_id: &str,
        approver_id: &str,
    ) -> Result<ActionResponse, WorkflowError> {
        self.append(WorkflowEvent::approved(doc_id, approver_id))
            .await
    }

    async fn append(&self, event: WorkflowEvent) -> Result<ActionResponse, WorkflowError> {
        let status = event.status();
        let kind = event.kind();
        let message_id = self
            .log
            .append(&event.to_fields())
            .await
            .map_err(|e| WorkflowError::Append(e.to_string()))?;
        info!(id = %message_id, kind, doc_id = event.doc_id(), "Appended workflow event");
        Ok(ActionResponse {
            success: true,
            message_id,
            status,
        })
    }
}
