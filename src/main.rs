use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{Notify, watch};

use payrail::config::AppConfig;
use payrail::db::{Database, schema};
use payrail::gateway::{self, state::AppState};
use payrail::ledger::TransferEngine;
use payrail::logging;
use payrail::outbox::{EventPublisher, HttpPublisher, OutboxWorker, WorkerConfig};
use payrail::user_auth::AuthService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());
    let config = AppConfig::load(&env)?;
    let _log_guard = logging::init_logging(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        git = env!("GIT_HASH"),
        env = %env,
        "Starting payrail"
    );

    let db = Database::connect(&config.postgres_url, config.postgres_pool_size)
        .await
        .context("Failed to connect to PostgreSQL")?;
    schema::init_schema(db.pool()).await?;

    let outbox_notify = Arc::new(Notify::new());
    let publisher: Arc<dyn EventPublisher> = Arc::new(
        HttpPublisher::new(
            &config.push.sink_url,
            Duration::from_secs(config.push.timeout_secs),
        )
        .context("Failed to build push sink client")?,
    );

    let engine = TransferEngine::new(db.pool().clone(), outbox_notify.clone());
    let auth = AuthService::new(db.pool().clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = OutboxWorker::new(
        db.pool().clone(),
        publisher,
        outbox_notify,
        WorkerConfig {
            poll_interval: Duration::from_secs(config.outbox.poll_interval_secs),
            publish_timeout: Duration::from_secs(config.push.timeout_secs),
            max_attempts: config.outbox.max_attempts,
        },
    );
    let worker_handle = tokio::spawn(worker.run(shutdown_rx.clone()));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let state = Arc::new(AppState::new(
        db,
        auth,
        engine,
        Duration::from_secs(config.gateway.request_timeout_secs),
    ));

    gateway::run_server(&config, state, shutdown_rx).await?;

    // The worker finishes its in-flight entry before exiting
    let _ = worker_handle.await;
    tracing::info!("Shutdown complete");
    Ok(())
}
