//! Health check endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use courier_common::db;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database = match &state.pool {
        Some(pool) => {
            if db::ping(pool).await {
                "up"
            } else {
                "down"
            }
        }
        None => "none",
    };

    Json(json!({
        "status": "ok",
        "service": "courier-api",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database
    }))
}
