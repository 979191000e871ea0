//! Notification record lookup.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use courier_common::error::AppError;
use courier_common::types::NotificationRecord;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/notifications/{id}", get(get_notification))
}

/// GET /api/notifications/{id}: fetch a single notification record.
async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<NotificationRecord>, AppError> {
    let record = state.store.get(id).await?;
    Ok(Json(record))
}
