//! Call API routes: upload, list, detail, audio URL.
//!
//! Thin wrappers over the producer and the stores. All pipeline
//! control-flow lives in the worker; these handlers only validate
//! input and project records.

use axum::{
    extract::{Multipart, Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{CallRecord, CallStatus};

use super::error::{ApiError, ApiResult};
use super::AppState;

/// Create the calls router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_calls))
        .route("/", get(list_calls))
        .route("/:call_id", get(get_call))
        .route("/:call_id/audio", get(get_call_audio_url))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub call_ids: Vec<String>,
}

/// POST /api/calls/upload - Accept one or more audio files.
///
/// Files are independent: the first per-file failure aborts the
/// response with an error, but jobs already enqueued for earlier files
/// proceed on their own.
async fn upload_calls(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut call_ids = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {}", e)))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            // Non-file form fields are ignored
            continue;
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read '{}': {}", filename, e)))?;

        let call_id = state
            .producer
            .store_upload(&filename, &bytes)
            .await
            .map_err(|e| ApiError::bad_request(format!("{:#}", e)))?;

        call_ids.push(call_id);
    }

    if call_ids.is_empty() {
        return Err(ApiError::bad_request("No files in upload"));
    }

    Ok(Json(UploadResponse {
        message: "Files uploaded successfully".to_string(),
        call_ids,
    }))
}

/// List projection of a call record
#[derive(Debug, Serialize)]
pub struct CallSummary {
    pub id: String,
    pub original_filename: String,
    pub upload_timestamp: DateTime<Utc>,
    pub status: CallStatus,
}

impl From<CallRecord> for CallSummary {
    fn from(record: CallRecord) -> Self {
        Self {
            id: record.id,
            original_filename: record.original_filename,
            upload_timestamp: record.upload_timestamp,
            status: record.status,
        }
    }
}

/// GET /api/calls - List all calls, newest first.
async fn list_calls(State(state): State<AppState>) -> ApiResult<Json<Vec<CallSummary>>> {
    let records = state.records.list().await?;
    Ok(Json(records.into_iter().map(CallSummary::from).collect()))
}

/// GET /api/calls/:id - Full record, including results and error.
async fn get_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> ApiResult<Json<CallRecord>> {
    let record = state
        .records
        .get(&call_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Call {} not found", call_id)))?;

    Ok(Json(record))
}

#[derive(Debug, Serialize)]
pub struct AudioUrlResponse {
    pub url: String,
}

/// GET /api/calls/:id/audio - Resolve the blob to a fetchable URL.
async fn get_call_audio_url(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> ApiResult<Json<AudioUrlResponse>> {
    let record = state
        .records
        .get(&call_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Call {} not found", call_id)))?;

    let url = state.blobs.url(&record.blob_path).await?;
    Ok(Json(AudioUrlResponse { url }))
}
