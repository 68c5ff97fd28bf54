//! Pipeline stage interfaces.
//!
//! Each stage is a pure input → output transformation from the worker's
//! point of view: transcription turns a blob reference into transcript
//! text, analysis turns transcript text into structured results. Any
//! stage fault propagates as an error and is caught at the job boundary
//! by the worker.

pub mod analyzer;
pub mod transcriber;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::AnalysisResults;

pub use analyzer::SimulatedAnalyzer;
pub use transcriber::{SimulatedTranscriber, WhisperTranscriber};

/// Transcription stage: blob reference in, transcript text out.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Transcribe the audio stored under `blob_path`.
    async fn transcribe(&self, blob_path: &str) -> Result<String>;
}

/// Analysis stage: transcript text in, structured results out.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Analyze a transcript into summary, sentiment and entities.
    async fn analyze(&self, transcript: &str) -> Result<AnalysisResults>;
}
