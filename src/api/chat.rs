//! Chat API route (placeholder).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::Value;

use super::error::{ApiError, ApiResult};
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

/// Create the chat router.
pub fn router() -> Router<AppState> {
    Router::new().route("/:call_id", post(chat_with_call))
}

/// POST /api/chat/:id - Not implemented yet.
///
/// The call must exist and the request shape is enforced, but there is
/// no chat backend behind this endpoint.
async fn chat_with_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<Value>> {
    state
        .records
        .get(&call_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Call {} not found", call_id)))?;

    let _ = request.query;
    Err(ApiError::new(
        StatusCode::NOT_IMPLEMENTED,
        "Chat is not implemented",
    ))
}
