//! Periodic reclamation of stuck deliveries.
//!
//! The only path (besides the original consumer waking up) by which a
//! crashed or hung consumer's entries get processed. Claims transfer
//! ownership atomically at the log level, then reuse the ordinary
//! decode → handle → ack path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use flowboard_common::WorkflowError;

use crate::dispatch::process_entry;
use crate::handler::SideEffect;
use crate::log::EventLog;

pub struct RecoverySweep {
    log: Arc<dyn EventLog>,
    handler: Arc<dyn SideEffect>,
    consumer: String,
    interval: Duration,
    min_idle: Duration,
    batch: usize,
    shutdown: watch::Receiver<bool>,
}

impl RecoverySweep {
    pub fn new(
        log: Arc<dyn EventLog>,
        handler: Arc<dyn SideEffect>,
        consumer: String,
        interval: Duration,
        min_idle: Duration,
        batch: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            log,
            handler,
            consumer,
            interval,
            min_idle,
            batch,
            shutdown,
        }
    }

    /// Run sweeps on a fixed timer until shutdown. Sweep failures are logged
    /// and swallowed; the next tick retries.
    pub async fn run(self) {
        let mut shutdown = self.shutdown.clone();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick of a tokio interval fires immediately; skip it so
        // sweeps start one full period after engine start.
        ticker.tick().await;

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.sweep().await;
                }
            }
        }
        info!(consumer = %self.consumer, "Recovery sweep stopped");
    }

    async fn sweep(&self) {
        let claimed = match self
            .log
            .claim_stale(&self.consumer, self.min_idle, self.batch)
            .await
        {
            Ok(claimed) => claimed,
            Err(e) => {
                let err = WorkflowError::Recovery(e.to_string());
                warn!(error = %err, "Error during message recovery");
                return;
            }
        };
        if claimed.is_empty() {
            return;
        }

        warn!(count = claimed.len(), "Recovered stuck messages, reprocessing");
        for entry in claimed {
            if let Err(e) = process_entry(&*self.log, &*self.handler, &entry).await {
                warn!(error = %e, id = %entry.id, "Reclaimed event left pending");
            }
        }
    }
}
