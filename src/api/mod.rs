//! REST API server: the producer-facing surface.
//!
//! Provides HTTP endpoints for:
//! - Uploading call recordings (creates records, enqueues jobs)
//! - Listing calls and reading one record
//! - Resolving a call's audio URL
//! - Chat (placeholder)
//!
//! Handlers hold only injected state; everything stateful lives in the
//! stores and the queue.

pub mod calls;
pub mod chat;
pub mod error;

use std::sync::Arc;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tracing::info;

use crate::ingest::Producer;
use crate::store::{BlobStore, RecordStore};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub producer: Arc<Producer>,
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
}

pub struct ApiServer {
    bind: String,
    state: AppState,
}

impl ApiServer {
    pub fn new(bind: String, state: AppState) -> Self {
        Self { bind, state }
    }

    /// Build the application router.
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/", get(service_info))
            .nest("/api/calls", calls::router())
            .nest("/api/chat", chat::router())
            .with_state(state)
    }

    pub async fn start(self) -> Result<()> {
        let app = Self::router(self.state);

        let listener = tokio::net::TcpListener::bind(&self.bind).await?;

        info!("API server listening on http://{}", self.bind);
        info!("Endpoints:");
        info!("  POST /api/calls/upload    - Upload recordings");
        info!("  GET  /api/calls           - List calls");
        info!("  GET  /api/calls/:id       - Call detail");
        info!("  GET  /api/calls/:id/audio - Audio URL");
        info!("  POST /api/chat/:id        - Chat (not implemented)");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "service": "callflow",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}
