//! The dispatch loop: claim, process, acknowledge.
//!
//! One loop per engine instance, identified by a unique consumer name within
//! the shared group. Delivery state lives entirely in the log; the loop only
//! decides when to ack. An entry is acknowledged strictly after its handler
//! succeeds — a failed handler leaves it pending for the recovery sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

use flowboard_common::{WorkflowError, WorkflowEvent};

use crate::handler::SideEffect;
use crate::log::{EventLog, StreamEntry};

pub struct Dispatcher {
    log: Arc<dyn EventLog>,
    handler: Arc<dyn SideEffect>,
    consumer: String,
    read_block: Duration,
    error_backoff: Duration,
    shutdown: watch::Receiver<bool>,
}

impl Dispatcher {
    pub fn new(
        log: Arc<dyn EventLog>,
        handler: Arc<dyn SideEffect>,
        consumer: String,
        read_block: Duration,
        error_backoff: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            log,
            handler,
            consumer,
            read_block,
            error_backoff,
            shutdown,
        }
    }

    /// Run until shutdown. The bounded blocking read guarantees the flag is
    /// observed at least once per wait interval; an in-flight batch always
    /// finishes before exit.
    pub async fn run(self) {
        let mut group_ready = match self.log.create_group().await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Failed to ensure consumer group, will retry");
                false
            }
        };
        info!(consumer = %self.consumer, "Dispatch loop started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }
            // Group creation is idempotent, so re-issuing it after any read
            // error also covers a group dropped out from under us.
            if !group_ready {
                match self.log.create_group().await {
                    Ok(()) => group_ready = true,
                    Err(e) => {
                        warn!(error = %e, "Consumer group still unavailable, backing off");
                        tokio::time::sleep(self.error_backoff).await;
                        continue;
                    }
                }
            }
            match self.log.read_group(&self.consumer, self.read_block).await {
                Ok(batch) => {
                    for entry in batch {
                        if let Err(e) =
                            process_entry(&*self.log, &*self.handler, &entry).await
                        {
                            warn!(error = %e, id = %entry.id, "Event left pending");
                        }
                    }
                }
                Err(e) => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                    warn!(error = %e, "Stream read error, backing off");
                    group_ready = false;
                    tokio::time::sleep(self.error_backoff).await;
                }
            }
        }
        info!(consumer = %self.consumer, "Dispatch loop stopped");
    }
}

/// Decode, execute the side effect, then acknowledge.
///
/// Shared by the dispatch loop and the recovery sweep so reclaimed entries
/// take exactly the ordinary path. Any error before the ack leaves the entry
/// in the pending ledger — this is the at-least-once guarantee.
pub(crate) async fn process_entry(
    log: &dyn EventLog,
    handler: &dyn SideEffect,
    entry: &StreamEntry,
) -> Result<(), WorkflowError> {
    let event = WorkflowEvent::from_fields(&entry.id, &entry.fields)?;

    handler
        .handle(&event)
        .await
        .map_err(|e| WorkflowError::Handler {
            id: entry.id.clone(),
            message: e.to_string(),
        })?;

    log.ack(&entry.id)
        .await
        .map_err(|e| WorkflowError::Delivery(e.to_string()))?;

    info!(id = %entry.id, kind = event.kind(), "Acknowledged");
    Ok(())
}
