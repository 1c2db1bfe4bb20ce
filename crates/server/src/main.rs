//! Guest cart maintenance server entry point.

use std::sync::Arc;

use domain::GuestCartRepository;
use kv_store::{RedisConfig, RedisKeyValueStore};
use server::config::Config;
use server::error::ServerError;
use server::{AppState, create_app, spawn_cleanup_task};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 3. Connect to the key-value store
    let store = RedisKeyValueStore::connect(
        RedisConfig::new(config.redis_url.clone()).with_operation_timeout(config.redis_timeout),
    )
    .await?;
    let repository = GuestCartRepository::new(store.clone()).with_lease(config.cart_lease);

    // 4. Start the periodic expiry sweep
    let cleanup = spawn_cleanup_task(repository.clone(), config.cleanup_interval);
    tracing::info!(
        interval_secs = config.cleanup_interval.as_secs(),
        lease_secs = config.cart_lease.as_secs(),
        "guest cart cleanup scheduled"
    );

    // 5. Build the application
    let app = create_app(Arc::new(AppState::new(repository)), metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting guest cart server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cleanup.abort();
    store.close().await;
    tracing::info!("server shut down gracefully");
    Ok(())
}
