//! JSONL-backed record store.
//!
//! Append-only JSONL with state derived from replay: each record
//! mutation is one JSON line, and the current shape of every record is
//! reconstructed by applying the log in order. The log doubles as a
//! transition history, which the integration tests use to assert
//! ordering.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::domain::{AnalysisResults, CallRecord, CallStatus};

use super::{RecordStore, StoreError};

/// One line in the record log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEvent {
    /// When this event was written
    pub timestamp: DateTime<Utc>,

    /// The record this event belongs to
    pub call_id: String,

    /// What happened
    #[serde(flatten)]
    pub kind: RecordEventKind,
}

/// Tagged event payloads (no open-ended key-value maps)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum RecordEventKind {
    /// Record created by the producer
    Created { record: CallRecord },

    /// Intermediate status transition
    StatusChanged { status: CallStatus },

    /// Terminal success: results and Completed in one write
    Completed { results: AnalysisResults },

    /// Terminal failure with cause
    Failed { error: String },
}

/// JSONL-based record store
pub struct JsonlRecordStore {
    /// Path to the calls.jsonl file
    log_path: PathBuf,

    /// Serializes check-then-append sequences (the CAS claim)
    write_lock: Mutex<()>,
}

impl JsonlRecordStore {
    /// Create a store backed by the given log file.
    pub fn new(log_path: PathBuf) -> Self {
        Self {
            log_path,
            write_lock: Mutex::new(()),
        }
    }

    /// Open a store, creating the parent directory if needed.
    pub async fn open(log_path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(Self::new(log_path))
    }

    /// Append an event to the log
    async fn append_event(&self, event: &RecordEvent) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await?;

        let json = serde_json::to_string(event)?;
        file.write_all(format!("{}\n", json).as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    /// Replay all events to build current state
    async fn replay(&self) -> Result<HashMap<String, CallRecord>, StoreError> {
        let mut records: HashMap<String, CallRecord> = HashMap::new();

        if !self.log_path.exists() {
            return Ok(records);
        }

        let file = File::open(&self.log_path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let event: RecordEvent = serde_json::from_str(&line)?;
            Self::apply_event(&mut records, event);
        }

        Ok(records)
    }

    /// Apply a single event to the state
    fn apply_event(records: &mut HashMap<String, CallRecord>, event: RecordEvent) {
        match event.kind {
            RecordEventKind::Created { record } => {
                records.insert(event.call_id, record);
            }
            RecordEventKind::StatusChanged { status } => {
                if let Some(record) = records.get_mut(&event.call_id) {
                    record.status = status;
                }
            }
            RecordEventKind::Completed { results } => {
                if let Some(record) = records.get_mut(&event.call_id) {
                    record.status = CallStatus::Completed;
                    record.analysis_results = Some(results);
                }
            }
            RecordEventKind::Failed { error } => {
                if let Some(record) = records.get_mut(&event.call_id) {
                    record.status = CallStatus::Failed;
                    record.processing_error = Some(error);
                }
            }
        }
    }

    /// Read the full transition history of one record, oldest first.
    ///
    /// Diagnostic surface: a stalled record shows exactly where the
    /// pipeline stopped.
    pub async fn history(&self, call_id: &str) -> Result<Vec<RecordEvent>, StoreError> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut events = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let event: RecordEvent = serde_json::from_str(&line)?;
            if event.call_id == call_id {
                events.push(event);
            }
        }

        Ok(events)
    }

    /// Validated transition: replay, check the machine, append.
    async fn transition(
        &self,
        call_id: &str,
        kind: RecordEventKind,
        to: CallStatus,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let records = self.replay().await?;
        let record = records
            .get(call_id)
            .ok_or_else(|| StoreError::NotFound(call_id.to_string()))?;

        if !record.status.can_advance_to(to) {
            return Err(StoreError::InvalidTransition {
                from: record.status,
                to,
            });
        }

        self.append_event(&RecordEvent {
            timestamp: Utc::now(),
            call_id: call_id.to_string(),
            kind,
        })
        .await
    }
}

#[async_trait]
impl RecordStore for JsonlRecordStore {
    async fn create(&self, record: &CallRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let records = self.replay().await?;
        if records.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(record.id.clone()));
        }

        self.append_event(&RecordEvent {
            timestamp: Utc::now(),
            call_id: record.id.clone(),
            kind: RecordEventKind::Created {
                record: record.clone(),
            },
        })
        .await
    }

    async fn get(&self, call_id: &str) -> Result<Option<CallRecord>, StoreError> {
        let records = self.replay().await?;
        Ok(records.get(call_id).cloned())
    }

    async fn list(&self) -> Result<Vec<CallRecord>, StoreError> {
        let records = self.replay().await?;
        let mut all: Vec<CallRecord> = records.into_values().collect();
        all.sort_by(|a, b| b.upload_timestamp.cmp(&a.upload_timestamp));
        Ok(all)
    }

    async fn begin_processing(&self, call_id: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;

        let records = self.replay().await?;
        let record = match records.get(call_id) {
            Some(r) => r,
            None => return Ok(false),
        };

        if record.status != CallStatus::Pending {
            return Ok(false);
        }

        self.append_event(&RecordEvent {
            timestamp: Utc::now(),
            call_id: call_id.to_string(),
            kind: RecordEventKind::StatusChanged {
                status: CallStatus::Processing,
            },
        })
        .await?;

        Ok(true)
    }

    async fn set_status(&self, call_id: &str, status: CallStatus) -> Result<(), StoreError> {
        self.transition(
            call_id,
            RecordEventKind::StatusChanged { status },
            status,
        )
        .await
    }

    async fn complete(
        &self,
        call_id: &str,
        results: AnalysisResults,
    ) -> Result<(), StoreError> {
        self.transition(
            call_id,
            RecordEventKind::Completed { results },
            CallStatus::Completed,
        )
        .await
    }

    async fn fail(&self, call_id: &str, error: &str) -> Result<(), StoreError> {
        self.transition(
            call_id,
            RecordEventKind::Failed {
                error: error.to_string(),
            },
            CallStatus::Failed,
        )
        .await
    }
}
