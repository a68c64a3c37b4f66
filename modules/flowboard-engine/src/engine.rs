//! Engine lifecycle: owns the shutdown flag and the background tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use flowboard_common::Config;

use crate::dispatch::Dispatcher;
use crate::handler::SideEffect;
use crate::log::EventLog;
use crate::recovery::RecoverySweep;

/// Tuning knobs for the background tasks. Split out of [`Config`] so tests
/// can run with short intervals without touching the process environment.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub read_block: Duration,
    pub read_error_backoff: Duration,
    pub recovery_interval: Duration,
    pub recovery_min_idle: Duration,
    pub recovery_batch: usize,
}

impl From<&Config> for EngineOptions {
    fn from(config: &Config) -> Self {
        Self {
            read_block: config.read_block,
            read_error_backoff: config.read_error_backoff,
            recovery_interval: config.recovery_interval,
            recovery_min_idle: config.recovery_min_idle,
            recovery_batch: config.recovery_batch,
        }
    }
}

/// One running engine instance: a dispatch loop plus a recovery sweep,
/// sharing a consumer identity and a shutdown flag.
///
/// `stop()` is idempotent and returns only after both tasks have observed
/// the flag and exited, so the caller can safely drop the log connection
/// afterwards.
pub struct WorkflowEngine {
    consumer: String,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl WorkflowEngine {
    pub fn start(
        log: Arc<dyn EventLog>,
        handler: Arc<dyn SideEffect>,
        options: EngineOptions,
    ) -> Self {
        let consumer = format!("worker_{}", Uuid::new_v4().simple());
        let (shutdown, shutdown_rx) = watch::channel(false);

        let dispatcher = Dispatcher::new(
            log.clone(),
            handler.clone(),
            consumer.clone(),
            options.read_block,
            options.read_error_backoff,
            shutdown_rx.clone(),
        );
        let sweep = RecoverySweep::new(
            log,
            handler,
            consumer.clone(),
            options.recovery_interval,
            options.recovery_min_idle,
            options.recovery_batch,
            shutdown_rx,
        );

        let tasks = vec![
            tokio::spawn(dispatcher.run()),
            tokio::spawn(sweep.run()),
        ];
        info!(consumer = %consumer, "Workflow engine started");

        Self {
            consumer,
            shutdown,
            tasks,
        }
    }

    /// This instance's consumer identity within the shared group.
    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    /// Signal shutdown and wait for the dispatch loop and recovery sweep to
    /// finish their in-flight work. Safe to call more than once.
    pub async fn stop(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        let _ = self.shutdown.send(true);
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        info!(consumer = %self.consumer, "Workflow engine stopped");
    }
}
