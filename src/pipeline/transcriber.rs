//! Transcription backends.
//!
//! The default backend is simulated: it verifies the blob exists and
//! emits a deterministic placeholder transcript. The whisper backend
//! stages the blob to a temp file and shells out to a local whisper
//! binary.

use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::store::BlobStore;

use super::Transcriber;

/// Simulated transcription backend.
///
/// Retrieval failures still surface as real stage faults: a missing
/// blob fails the job the same way a decode error would.
pub struct SimulatedTranscriber {
    blobs: Arc<dyn BlobStore>,
}

impl SimulatedTranscriber {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }
}

#[async_trait]
impl Transcriber for SimulatedTranscriber {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn transcribe(&self, blob_path: &str) -> Result<String> {
        if !self.blobs.exists(blob_path).await? {
            anyhow::bail!("file not found: {}", blob_path);
        }

        Ok(format!(
            "This is a placeholder transcript for the file '{}'. The client \
             mentioned the price was too high but agreed to a follow-up call \
             next Tuesday.",
            blob_path
        ))
    }
}

/// Whisper output JSON structure
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    text: String,
}

/// Transcription via a local whisper binary.
pub struct WhisperTranscriber {
    blobs: Arc<dyn BlobStore>,
    whisper_path: String,
    model: String,
}

impl WhisperTranscriber {
    pub fn new(blobs: Arc<dyn BlobStore>, whisper_path: String, model: String) -> Self {
        Self {
            blobs,
            whisper_path,
            model,
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    fn name(&self) -> &str {
        "whisper"
    }

    async fn transcribe(&self, blob_path: &str) -> Result<String> {
        // Stage the blob to a local file whisper can read
        let bytes = self
            .blobs
            .fetch(blob_path)
            .await
            .with_context(|| format!("Failed to fetch blob '{}'", blob_path))?;

        let temp_dir = tempfile::tempdir().context("Failed to create temp dir")?;
        let audio_path = temp_dir.path().join(blob_path);
        tokio::fs::write(&audio_path, &bytes)
            .await
            .context("Failed to stage audio for whisper")?;

        let output = Command::new(&self.whisper_path)
            .arg(&audio_path)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_dir")
            .arg(temp_dir.path())
            .arg("--output_format")
            .arg("json")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to run whisper")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Whisper failed: {}", stderr);
        }

        // Whisper writes <stem>.json next to the requested output dir
        let stem = audio_path.file_stem().unwrap_or_default().to_string_lossy();
        let json_path = temp_dir.path().join(format!("{}.json", stem));

        let json_content = tokio::fs::read_to_string(&json_path)
            .await
            .context("Failed to read whisper output")?;

        let whisper: WhisperOutput =
            serde_json::from_str(&json_content).context("Failed to parse whisper JSON")?;

        Ok(whisper.text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FsBlobStore;
    use tempfile::TempDir;

    async fn blob_store_with(name: &str, bytes: &[u8]) -> (Arc<dyn BlobStore>, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = FsBlobStore::open(temp.path().join("blobs")).await.unwrap();
        store.put(name, bytes).await.unwrap();
        (Arc::new(store), temp)
    }

    #[tokio::test]
    async fn test_simulated_transcript_mentions_blob() {
        let (blobs, _temp) = blob_store_with("call1-abc.wav", b"audio").await;
        let transcriber = SimulatedTranscriber::new(blobs);

        let transcript = transcriber.transcribe("call1-abc.wav").await.unwrap();
        assert!(transcript.contains("call1-abc.wav"));
        assert!(transcript.contains("next Tuesday"));
    }

    #[tokio::test]
    async fn test_simulated_is_deterministic() {
        let (blobs, _temp) = blob_store_with("call1-abc.wav", b"audio").await;
        let transcriber = SimulatedTranscriber::new(blobs);

        let a = transcriber.transcribe("call1-abc.wav").await.unwrap();
        let b = transcriber.transcribe("call1-abc.wav").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_missing_blob_is_a_stage_fault() {
        let (blobs, _temp) = blob_store_with("other.wav", b"audio").await;
        let transcriber = SimulatedTranscriber::new(blobs);

        let err = transcriber.transcribe("gone.wav").await.unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }
}
