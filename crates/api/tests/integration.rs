//! Integration tests for API routes.
//!
//! Uses `tower::ServiceExt` to test Axum routes without a real HTTP server,
//! backed by the in-memory store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use uuid::Uuid;

use courier_api::routes::create_router;
use courier_api::state::AppState;
use courier_common::types::{NotificationRecord, NotificationRequest, NotificationStatus};
use courier_engine::store::{MemoryNotificationStore, NotificationStore};

// ============================================================
// Helpers
// ============================================================

async fn get_json(state: AppState, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = create_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn telegram_request() -> NotificationRequest {
    NotificationRequest {
        user_id: "user-123".to_string(),
        notification_type: "telegram".into(),
        channel: "4242".to_string(),
        subject: "Alert".to_string(),
        content: "disk full".to_string(),
        metadata: None,
    }
}

// ============================================================
// Route tests
// ============================================================

#[tokio::test]
async fn test_health_endpoint() {
    let state = AppState::new(Arc::new(MemoryNotificationStore::new()), None);

    let (status, json) = get_json(state, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "courier-api");
    assert_eq!(json["database"], "none");
}

#[tokio::test]
async fn test_get_notification_returns_record() {
    let store = Arc::new(MemoryNotificationStore::new());
    let id = store
        .create(&NotificationRecord::pending(telegram_request()))
        .await
        .unwrap();
    store
        .update_status(id, NotificationStatus::Sent)
        .await
        .unwrap();

    let state = AppState::new(store, None);
    let (status, json) = get_json(state, &format!("/api/notifications/{}", id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], id.to_string());
    assert_eq!(json["type"], "telegram");
    assert_eq!(json["channel"], "4242");
    assert_eq!(json["status"], "sent");
    assert!(json["sent_at"].is_string());
}

#[tokio::test]
async fn test_pending_record_omits_sent_at() {
    let store = Arc::new(MemoryNotificationStore::new());
    let id = store
        .create(&NotificationRecord::pending(telegram_request()))
        .await
        .unwrap();

    let state = AppState::new(store, None);
    let (status, json) = get_json(state, &format!("/api/notifications/{}", id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "pending");
    assert!(json.get("sent_at").is_none());
}

#[tokio::test]
async fn test_unknown_notification_is_404() {
    let state = AppState::new(Arc::new(MemoryNotificationStore::new()), None);

    let (status, json) =
        get_json(state, &format!("/api/notifications/{}", Uuid::new_v4())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_malformed_id_is_rejected() {
    let state = AppState::new(Arc::new(MemoryNotificationStore::new()), None);

    let (status, _) = get_json(state, "/api/notifications/not-a-uuid").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
