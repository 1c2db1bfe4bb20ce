//! Maintenance server for the guest cart engine.
//!
//! Owns the key-value store client, sweeps expired guest carts on a fixed
//! period and exposes health, statistics and Prometheus metrics over HTTP.
//! Cart operations themselves are served elsewhere.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use domain::{CleanupReport, GuestCartRepository};
use kv_store::KeyValueStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::trace::TraceLayer;

/// Shared state of the HTTP handlers.
pub struct AppState<S: KeyValueStore> {
    pub repository: GuestCartRepository<S>,
}

impl<S: KeyValueStore> AppState<S> {
    pub fn new(repository: GuestCartRepository<S>) -> Self {
        Self { repository }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: KeyValueStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/stats", get(routes::stats::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(TraceLayer::new_for_http())
}

/// Runs one expiry sweep and records the resulting keyspace gauges.
pub async fn run_cleanup_pass<S: KeyValueStore>(
    repository: &GuestCartRepository<S>,
) -> domain::Result<CleanupReport> {
    let cleaned_up = repository.cleanup_expired_carts().await?;
    let stats = repository.get_cart_stats().await;

    metrics::gauge!("guest_carts_total").set(stats.total_carts as f64);
    metrics::gauge!("guest_carts_active").set(stats.active_carts as f64);
    metrics::gauge!("guest_carts_expiring_soon").set(stats.expiring_soon as f64);

    Ok(CleanupReport { cleaned_up, stats })
}

/// Spawns the periodic expiry sweep.
///
/// The first sweep runs immediately. A failed sweep is logged and the loop
/// carries on with the next tick. Abort the returned handle to stop it.
pub fn spawn_cleanup_task<S: KeyValueStore + 'static>(
    repository: GuestCartRepository<S>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match run_cleanup_pass(&repository).await {
                Ok(report) => tracing::info!(
                    cleaned_up = report.cleaned_up,
                    total = report.stats.total_carts,
                    active = report.stats.active_carts,
                    expiring_soon = report.stats.expiring_soon,
                    "guest cart cleanup pass finished"
                ),
                Err(err) => tracing::error!(error = %err, "guest cart cleanup pass failed"),
            }
        }
    })
}
