//! Integration tests for the maintenance server.

use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::CartId;
use domain::{GuestCartRepository, NewCartItem, Quantity};
use kv_store::{InMemoryKeyValueStore, KeyValueStore};
use metrics_exporter_prometheus::PrometheusHandle;
use server::{AppState, create_app, run_cleanup_pass, spawn_cleanup_task};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (axum::Router, GuestCartRepository<InMemoryKeyValueStore>) {
    let repository = GuestCartRepository::new(InMemoryKeyValueStore::new());
    let app = create_app(
        Arc::new(AppState::new(repository.clone())),
        get_metrics_handle(),
    );
    (app, repository)
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn add_item(repository: &GuestCartRepository<InMemoryKeyValueStore>) -> CartId {
    let cart_id = CartId::new();
    repository
        .add_item_to_cart(
            cart_id,
            NewCartItem::new("rest-1", "meal-1", Quantity::new(2).unwrap()),
        )
        .await
        .unwrap();
    cart_id
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let (status, json) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["store"], "ok");
}

#[tokio::test]
async fn test_health_check_reports_unreachable_store() {
    let (app, repository) = setup();
    repository.store().set_fail_on_read(true);

    let (status, json) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["store"], "unreachable");
}

#[tokio::test]
async fn test_stats_counts_live_carts() {
    let (app, repository) = setup();
    add_item(&repository).await;
    add_item(&repository).await;

    let (status, json) = get_json(app, "/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_carts"], 2);
    assert_eq!(json["active_carts"], 2);
    assert_eq!(json["expiring_soon"], 0);
    assert_eq!(json["expired_carts"], 0);
}

#[tokio::test]
async fn test_stats_reports_leaseless_records_as_expired() {
    let (app, repository) = setup();
    add_item(&repository).await;
    repository
        .store()
        .set_wire("cart:anon:stale", "{}", None)
        .await;

    let (_, json) = get_json(app, "/stats").await;

    assert_eq!(json["total_carts"], 2);
    assert_eq!(json["active_carts"], 1);
    assert_eq!(json["expired_carts"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/cart/anon")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cleanup_pass_removes_leaseless_records() {
    let repository = GuestCartRepository::new(InMemoryKeyValueStore::new());
    let live = add_item(&repository).await;
    let stale = CartId::new();
    let stale_key = GuestCartRepository::<InMemoryKeyValueStore>::cart_key(stale);
    repository.store().set_wire(&stale_key, "{}", None).await;

    let report = run_cleanup_pass(&repository).await.unwrap();

    assert_eq!(report.cleaned_up, 1);
    assert_eq!(report.stats.total_carts, 1);
    assert_eq!(report.stats.active_carts, 1);
    assert!(repository.cart_exists(live).await.unwrap());
    assert!(!repository.cart_exists(stale).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_task_runs_every_interval() {
    let store = InMemoryKeyValueStore::new();
    let repository = GuestCartRepository::new(store.clone());
    store.set_wire("cart:anon:first", "{}", None).await;

    let handle = spawn_cleanup_task(repository, Duration::from_secs(60));

    // The first tick fires immediately.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!store.exists("cart:anon:first").await.unwrap());

    store.set_wire("cart:anon:second", "{}", None).await;
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(store.exists("cart:anon:second").await.unwrap());

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(!store.exists("cart:anon:second").await.unwrap());

    handle.abort();
}
