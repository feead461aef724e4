use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::copy::CopyHandler;
use crate::event::StorageNotification;
use crate::handler::MetadataHandler;

#[derive(Clone)]
pub struct AppState {
    pub metadata_handler: Arc<MetadataHandler>,
    /// None if no target bucket is configured
    pub copy_handler: Option<Arc<CopyHandler>>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", post(events))
        .route("/copy", post(copy))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

async fn events(State(state): State<AppState>, Json(notification): Json<StorageNotification>) -> Response {
    let result = match notification.objects() {
        Ok(objects) => state.metadata_handler.handle_all(&objects).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(uploaded) => Json(uploaded).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn copy(State(state): State<AppState>, Json(notification): Json<StorageNotification>) -> Response {
    let copy_handler = match &state.copy_handler {
        Some(h) => h,
        None => return (StatusCode::SERVICE_UNAVAILABLE, "no target bucket configured").into_response(),
    };

    let objects = match notification.objects() {
        Ok(objects) => objects,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };
    let object = match objects.first() {
        Some(o) => o,
        None => return (StatusCode::BAD_REQUEST, "notification contains no records").into_response(),
    };

    match copy_handler.handle(&object.bucket, &object.key).await {
        Ok(outcome) => {
            let status_code = outcome.status_code();
            let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({ "statusCode": status_code }))).into_response()
        }
        Err(e) => {
            error!("copying {}/{} failed: {:#}", object.bucket, object.key, e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)).into_response()
        }
    }
}
