//! callflow - queue-driven processing pipeline for call recordings
//!
//! Uploaded audio is stored as a blob, tracked by a call record, and
//! handed to a background worker through a durable FIFO queue. The
//! worker drives each job through transcription and analysis, writing
//! every status transition to the record store.
//!
//! # Architecture
//!
//! ```text
//! upload → blob store + record (PENDING) → job queue → worker
//!                                                        │
//!                       PROCESSING → TRANSCRIBING → ANALYZING → COMPLETED
//!                                      (any fault → FAILED)
//! ```
//!
//! - A record's status only moves forward; each transition is a
//!   separate persisted write, so a stalled record shows where it died.
//! - A faulting job marks its record FAILED and never halts the worker.
//! - Stores and the queue are constructed once and injected; tests run
//!   the full pipeline against a scratch directory.
//!
//! # Modules
//!
//! - `domain`: CallRecord, CallStatus, AnalysisResults, Job
//! - `store`: record and blob persistence (JSONL / filesystem)
//! - `queue`: durable FIFO job handoff
//! - `pipeline`: transcription and analysis stage backends
//! - `ingest`: the upload producer
//! - `worker`: the queue consumer loop
//! - `api`: axum HTTP surface
//! - `cli`: command-line interface

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod ingest;
pub mod pipeline;
pub mod queue;
pub mod store;
pub mod worker;

// Re-export main types at crate root for convenience
pub use domain::{AnalysisResults, CallRecord, CallStatus, Entity, Job, Sentiment};
pub use ingest::Producer;
pub use pipeline::{Analyzer, Transcriber};
pub use queue::{JobQueue, JsonlJobQueue};
pub use store::{BlobStore, FsBlobStore, JsonlRecordStore, RecordStore};
pub use worker::{JobOutcome, Worker, WorkerHandle};
