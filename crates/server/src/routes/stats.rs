//! Guest cart keyspace statistics.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::CartStats;
use kv_store::KeyValueStore;

use crate::AppState;

/// GET /stats: counts guest carts by lease state.
///
/// Walks the whole cart namespace; meant for operators, not hot paths.
pub async fn get<S: KeyValueStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<CartStats> {
    Json(state.repository.get_cart_stats().await)
}
