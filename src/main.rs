use payment_processing_service::config::Config;
use payment_processing_service::gateway::{self, AppState};
use payment_processing_service::outbox::OutboxRelay;
use payment_processing_service::payment::PaymentEngine;
use payment_processing_service::providers;
use payment_processing_service::queue::{JobQueue, RedisQueue};
use payment_processing_service::workers::{PayoutWorker, WebhookWorker};
use payment_processing_service::{db, logging};

use std::sync::Arc;
use tokio::sync::watch;

const SEED_FILE: &str = "seeds/000001_seed_data.sql";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let _log_guard = logging::init_logging(&config);

    tracing::info!(port = config.port, "starting payment processing service");

    let pool = db::connect(&config.database_url()).await?;
    db::run_migrations(&pool).await?;
    db::apply_seeds(&pool, SEED_FILE).await;

    let queue: Arc<dyn JobQueue> = Arc::new(RedisQueue::new(&config.redis_url, pool.clone()).await?);

    let registry = Arc::new(providers::setup_registry());
    let engine = PaymentEngine::new(pool.clone(), registry.clone());

    let state = Arc::new(AppState::new(
        pool.clone(),
        engine,
        queue.clone(),
        registry.clone(),
    ));

    // Root cancellation: workers observe this between ticks, the server
    // drains in-flight requests.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let relay = OutboxRelay::new(pool.clone(), queue.clone());
    let relay_shutdown = shutdown_rx.clone();
    let relay_handle = tokio::spawn(async move { relay.run(relay_shutdown).await });

    let payout_worker = PayoutWorker::new(pool.clone(), registry.clone(), queue.clone());
    let payout_shutdown = shutdown_rx.clone();
    let payout_handle = tokio::spawn(async move { payout_worker.run(payout_shutdown).await });

    let webhook_worker = WebhookWorker::new(pool.clone(), queue.clone());
    let webhook_shutdown = shutdown_rx.clone();
    let webhook_handle = tokio::spawn(async move { webhook_worker.run(webhook_shutdown).await });

    let server_shutdown = shutdown_rx.clone();
    let server = tokio::spawn(async move {
        gateway::run_server(state, config.port, server_shutdown).await
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    let _ = server.await;
    let _ = tokio::join!(relay_handle, payout_handle, webhook_handle);

    tracing::info!("payment processing service stopped");
    Ok(())
}
