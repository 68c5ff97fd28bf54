//! Domain types for the call processing pipeline.
//!
//! This module contains the core data structures:
//! - CallRecord: a persisted call and its processing lifecycle
//! - CallStatus: the one-directional status state machine
//! - AnalysisResults: final pipeline output
//! - Job: transient queue message referencing a record

pub mod call;
pub mod job;

// Re-export commonly used types
pub use call::{AnalysisResults, CallRecord, CallStatus, Entity, Sentiment};
pub use job::Job;
