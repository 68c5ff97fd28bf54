//! Call records and the processing status state machine.
//!
//! A record's status only ever moves forward: PENDING → PROCESSING →
//! TRANSCRIBING → ANALYZING → COMPLETED, with FAILED reachable from any
//! non-terminal state. Transitions are validated here; the store rejects
//! anything the machine does not permit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing status of a call record.
///
/// Persisted as SCREAMING_SNAKE strings, the same shape on disk and
/// over the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallStatus {
    /// Created by the producer, waiting for a worker
    Pending,

    /// Claimed by a worker, record being loaded
    Processing,

    /// Transcription stage running
    Transcribing,

    /// Analysis stage running
    Analyzing,

    /// Pipeline finished, results written (terminal)
    Completed,

    /// A stage faulted; `processing_error` holds the cause (terminal)
    Failed,
}

impl CallStatus {
    /// Whether this status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the machine permits moving from `self` to `next`.
    ///
    /// The happy path is strictly sequential (no skipping); Failed is
    /// reachable from any non-terminal state.
    pub fn can_advance_to(&self, next: CallStatus) -> bool {
        if next == CallStatus::Failed {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Transcribing)
                | (Self::Transcribing, Self::Analyzing)
                | (Self::Analyzing, Self::Completed)
        )
    }
}

/// Detected sentiment of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// A named entity extracted from the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Surface text of the entity
    pub text: String,

    /// Entity category (KEYWORD, DATE, ...)
    #[serde(rename = "type")]
    pub entity_type: String,
}

/// Final output of the analysis stage, written exactly once on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResults {
    /// One-paragraph summary of the call
    pub summary: String,

    /// Overall sentiment
    pub sentiment: Sentiment,

    /// Entities in transcript order
    pub entities: Vec<Entity>,

    /// Echo of the transcript the analysis ran on
    pub full_transcript: String,
}

/// A persisted call record tracking one uploaded recording's lifecycle.
///
/// Created by the producer with status Pending; mutated only by the
/// worker thereafter. `original_filename`, `blob_path` and
/// `upload_timestamp` are immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Filename as supplied by the uploader
    pub original_filename: String,

    /// Object-store key of the audio bytes
    pub blob_path: String,

    /// When the upload was accepted
    pub upload_timestamp: DateTime<Utc>,

    /// Current position in the state machine
    pub status: CallStatus,

    /// Set exactly once, together with the Completed transition
    pub analysis_results: Option<AnalysisResults>,

    /// Set on Failed; overwritten on each failure
    pub processing_error: Option<String>,
}

impl CallRecord {
    /// Create a fresh Pending record for an accepted upload.
    pub fn new(id: String, original_filename: String, blob_path: String) -> Self {
        Self {
            id,
            original_filename,
            blob_path,
            upload_timestamp: Utc::now(),
            status: CallStatus::Pending,
            analysis_results: None,
            processing_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_is_strictly_sequential() {
        use CallStatus::*;

        assert!(Pending.can_advance_to(Processing));
        assert!(Processing.can_advance_to(Transcribing));
        assert!(Transcribing.can_advance_to(Analyzing));
        assert!(Analyzing.can_advance_to(Completed));

        // No skipping
        assert!(!Pending.can_advance_to(Transcribing));
        assert!(!Processing.can_advance_to(Analyzing));
        assert!(!Pending.can_advance_to(Completed));

        // No going back
        assert!(!Transcribing.can_advance_to(Processing));
        assert!(!Completed.can_advance_to(Pending));
    }

    #[test]
    fn test_failed_reachable_from_non_terminal_only() {
        use CallStatus::*;

        for status in [Pending, Processing, Transcribing, Analyzing] {
            assert!(status.can_advance_to(Failed), "{:?} should fail", status);
        }
        assert!(!Completed.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Failed));
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&CallStatus::Transcribing).unwrap();
        assert_eq!(json, "\"TRANSCRIBING\"");

        let parsed: CallStatus = serde_json::from_str("\"FAILED\"").unwrap();
        assert_eq!(parsed, CallStatus::Failed);
    }

    #[test]
    fn test_entity_serializes_type_field() {
        let entity = Entity {
            text: "next Tuesday".to_string(),
            entity_type: "DATE".to_string(),
        };

        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["type"], "DATE");
        assert!(json.get("entity_type").is_none());
    }

    #[test]
    fn test_new_record_is_pending() {
        let record = CallRecord::new(
            "abc".to_string(),
            "call1.wav".to_string(),
            "call1-deadbeef.wav".to_string(),
        );

        assert_eq!(record.status, CallStatus::Pending);
        assert!(record.analysis_results.is_none());
        assert!(record.processing_error.is_none());
    }
}
