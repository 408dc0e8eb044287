use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use tracing::error;

use crate::error::GenerationError;
use crate::AppState;

/// POST /api/generate — run the memo pipeline over a batch of signals
///
/// A body that is not JSON gets the same structured 400 as a bad `signals`
/// field.
pub async fn generate_memo(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return GenerationError::Validation(format!(
                "Request body is not valid JSON: {}",
                rejection.body_text()
            ))
            .into_response();
        }
    };

    match state.handler.generate(body).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            if !e.kind().is_client_error() {
                error!(kind = %e.kind(), "generate memo: {e}");
            }
            e.into_response()
        }
    }
}
