//! Shared application state for the Axum API server.

use std::sync::Arc;

use courier_engine::store::NotificationStore;
use sqlx::PgPool;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NotificationStore>,
    /// Present when backed by Postgres; reported by the health check.
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(store: Arc<dyn NotificationStore>, pool: Option<PgPool>) -> Self {
        Self { store, pool }
    }
}
