use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use flowboard_common::Config;
use flowboard_engine::{
    BoardProjector, EngineOptions, EventLog, LoggingSideEffect, MemoryLog, Producer, RedisLog,
    WorkflowEngine,
};
use flowboard_server::routes::{self, AppState};

/// Simulated per-event work in the stub side-effect handler.
const STUB_WORK_DELAY: Duration = Duration::from_secs(3);

#[derive(Parser)]
#[command(name = "flowboard-server", about = "Document approval workflow server")]
struct Cli {
    /// Run against an in-process event log instead of Redis.
    #[arg(long)]
    memory_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting flowboard-server");

    let cli = Cli::parse();
    let config = Config::from_env();

    let log: Arc<dyn EventLog> = if cli.memory_log {
        tracing::warn!("Using in-process event log; events do not survive restarts");
        Arc::new(MemoryLog::new(config.stream_max_len))
    } else {
        Arc::new(
            RedisLog::connect(
                &config.redis_url,
                config.stream_key.clone(),
                config.group_name.clone(),
                config.stream_max_len,
            )
            .await?,
        )
    };

    let producer = Producer::new(log.clone());
    let projector = BoardProjector::new(log.clone(), config.board_fetch_count);
    let handler = Arc::new(LoggingSideEffect::new(STUB_WORK_DELAY));

    let mut engine = WorkflowEngine::start(log, handler, EngineOptions::from(&config));

    let state = Arc::new(AppState {
        producer,
        projector,
        push_interval: config.push_interval,
    });
    let app = routes::build_router(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(addr = %addr, consumer = engine.consumer(), "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The engine observes the flag and drains in-flight work before the log
    // connection is dropped.
    tracing::info!("Shutting down");
    engine.stop().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
