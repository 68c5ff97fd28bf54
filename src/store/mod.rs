//! Persistence interfaces for call records and audio blobs.
//!
//! Stores are constructed once at process start and passed by handle
//! into the producer and the worker; nothing here is a global. The
//! traits are the seams tests use to substitute backends.

pub mod blobs;
pub mod records;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{AnalysisResults, CallRecord, CallStatus};

pub use blobs::FsBlobStore;
pub use records::JsonlRecordStore;

/// Errors from the record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Call record not found: {0}")]
    NotFound(String),

    #[error("Call record already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid status transition: {from:?} → {to:?}")]
    InvalidTransition { from: CallStatus, to: CallStatus },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence for call records and their status transitions.
///
/// Every transition is a separate persisted write, so a crash
/// mid-pipeline leaves the record visibly stalled at its last-written
/// state rather than silently Pending.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a newly created record (status must be Pending).
    async fn create(&self, record: &CallRecord) -> Result<(), StoreError>;

    /// Fetch a record by ID.
    async fn get(&self, call_id: &str) -> Result<Option<CallRecord>, StoreError>;

    /// List all records, newest upload first.
    async fn list(&self) -> Result<Vec<CallRecord>, StoreError>;

    /// Claim a record for processing: Pending → Processing, but only if
    /// it is currently Pending. Returns false when the claim loses
    /// (already claimed, terminal, or unknown) — the guard against a
    /// duplicated queue delivery.
    async fn begin_processing(&self, call_id: &str) -> Result<bool, StoreError>;

    /// Advance to an intermediate status (Transcribing, Analyzing).
    /// Rejects transitions the state machine does not permit.
    async fn set_status(&self, call_id: &str, status: CallStatus) -> Result<(), StoreError>;

    /// Write analysis results and the Completed status in one event.
    async fn complete(&self, call_id: &str, results: AnalysisResults)
        -> Result<(), StoreError>;

    /// Mark the record Failed with a human-readable cause.
    async fn fail(&self, call_id: &str, error: &str) -> Result<(), StoreError>;
}

/// Errors from the blob store
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid object name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Object storage for raw audio bytes, addressed by generated key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under an object name.
    async fn put(&self, object_name: &str, bytes: &[u8]) -> Result<(), BlobError>;

    /// Fetch the bytes for an object name.
    async fn fetch(&self, object_name: &str) -> Result<Vec<u8>, BlobError>;

    /// Whether an object exists.
    async fn exists(&self, object_name: &str) -> Result<bool, BlobError>;

    /// Resolve an object name to a fetchable URL.
    async fn url(&self, object_name: &str) -> Result<String, BlobError>;
}
