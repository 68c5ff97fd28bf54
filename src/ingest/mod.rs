//! Upload ingestion: the producer side of the pipeline.
//!
//! For each accepted file: generate a collision-resistant object name,
//! store the bytes, create a Pending call record, then enqueue a job
//! referencing it. Enqueue is last, so a failure anywhere earlier never
//! leaves a job pointing at a half-created upload. Files in a batch are
//! independent; batch semantics live in the API layer.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use uuid::Uuid;

use crate::domain::{CallRecord, Job};
use crate::queue::JobQueue;
use crate::store::{BlobStore, RecordStore};

/// The upload producer, holding injected store and queue handles.
pub struct Producer {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    queue: Arc<dyn JobQueue>,
}

impl Producer {
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            records,
            blobs,
            queue,
        }
    }

    /// Ingest one uploaded file end to end; returns the new call ID.
    pub async fn store_upload(&self, original_filename: &str, bytes: &[u8]) -> Result<String> {
        let object_name = generate_object_name(original_filename)?;

        self.blobs
            .put(&object_name, bytes)
            .await
            .with_context(|| format!("Failed to store blob for '{}'", original_filename))?;

        let record = CallRecord::new(
            Uuid::new_v4().to_string(),
            original_filename.to_string(),
            object_name.clone(),
        );
        self.records
            .create(&record)
            .await
            .with_context(|| format!("Failed to create record for '{}'", original_filename))?;

        self.queue
            .enqueue(&Job::new(record.id.clone()))
            .await
            .with_context(|| format!("Failed to enqueue job for '{}'", record.id))?;

        info!(
            call_id = %record.id,
            blob = %object_name,
            "Upload accepted: {}",
            original_filename
        );

        Ok(record.id)
    }
}

/// Generate a collision-resistant object name from an uploaded filename.
///
/// Keeps the original stem and extension, inserts a random suffix:
/// `call1.wav` → `call1-3fa85f64.wav`. Any path components the client
/// sent are stripped first.
pub fn generate_object_name(original_filename: &str) -> Result<String> {
    let base = Path::new(original_filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let stem = Path::new(base)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    if stem.is_empty() || stem == ".." {
        anyhow::bail!("Invalid filename: '{}'", original_filename);
    }

    let suffix = Uuid::new_v4().simple().to_string();
    let suffix = &suffix[..8];

    let name = match Path::new(base).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}-{}.{}", stem, suffix, ext),
        None => format!("{}-{}", stem, suffix),
    };

    Ok(name)
}
