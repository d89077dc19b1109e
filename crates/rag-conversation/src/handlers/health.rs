use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::services::conversation::{ConversationManager, StoreStats};

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Ready while the store can still accept new sessions
pub async fn readiness_check(State(manager): State<Arc<ConversationManager>>) -> StatusCode {
    match manager.store().ensure_capacity() {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub async fn stats_handler(State(manager): State<Arc<ConversationManager>>) -> Json<StoreStats> {
    Json(manager.stats())
}
