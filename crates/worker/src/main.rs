use std::sync::Arc;

use anyhow::Context;
use drip_db::PgStore;
use drip_events::{CertificateDispatcher, EventBus, WebhookDelivery};
use drip_worker::config::WorkerConfig;
use drip_worker::services::CompletionService;
use drip_worker::sweep;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drip_worker=debug,drip_events=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env()?;
    tracing::info!(
        sweep_interval_secs = config.sweep_interval.as_secs(),
        completion_threshold = config.engine.completion_threshold,
        certificate_webhook = config.certificate_webhook_url.is_some(),
        "Loaded worker configuration"
    );

    // --- Database ---
    let pool = drip_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    drip_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    drip_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    let store = Arc::new(PgStore::new(pool));

    // --- Event bus and certificate hand-off ---
    let bus = Arc::new(EventBus::default());
    let dispatcher = CertificateDispatcher::new(
        config.certificate_webhook_url.clone(),
        WebhookDelivery::new()?,
    );
    let dispatcher_handle = tokio::spawn(dispatcher.run(bus.subscribe()));

    // --- Completion sweep ---
    let completion = Arc::new(CompletionService::new(store.clone(), bus.clone()));
    let cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(sweep::run(
        store.clone(),
        completion,
        config.sweep_interval,
        cancel.clone(),
    ));

    shutdown_signal().await;

    cancel.cancel();
    if let Err(e) = sweep_handle.await {
        tracing::error!(error = %e, "Completion sweep task failed");
    }

    // Dropping the last sender closes the bus and stops the dispatcher.
    drop(bus);
    if let Err(e) = dispatcher_handle.await {
        tracing::error!(error = %e, "Certificate dispatcher task failed");
    }

    store.pool().close().await;
    tracing::info!("Worker shut down");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
