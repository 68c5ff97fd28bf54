//! Durable FIFO handoff of jobs between the producer and the worker.
//!
//! The queue carries only `{call_id}` references; all mutable state
//! lives on the call record. Delivery is fire-and-forget: a popped job
//! that never reaches a terminal status is lost. The record store's
//! claim guard covers the duplicate side if redelivery is ever added.

pub mod jsonl;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Job;

pub use jsonl::JsonlJobQueue;

/// Errors from the job queue
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// FIFO job queue between producer and worker.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Append a job to the tail. Visible to consumers immediately;
    /// there is no delivery acknowledgment.
    async fn enqueue(&self, job: &Job) -> Result<(), QueueError>;

    /// Pop the head job, blocking indefinitely until one is available.
    ///
    /// Not cancel-safe: the popped marker is durable before the job is
    /// returned, so dropping the future mid-flight can lose a job.
    /// Callers that need to race a stop signal poll `try_dequeue`
    /// instead.
    async fn dequeue(&self) -> Result<Job, QueueError>;

    /// Pop the head job if one is available.
    async fn try_dequeue(&self) -> Result<Option<Job>, QueueError>;

    /// Number of jobs currently waiting.
    async fn pending(&self) -> Result<usize, QueueError>;
}
