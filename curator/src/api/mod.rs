//! HTTP API routes for the memo gateway

use std::sync::Arc;

use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

pub mod generate;

use crate::AppState;

/// Configure all API routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/generate", post(generate::generate_memo))
}

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
