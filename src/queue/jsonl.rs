//! JSONL-backed job queue.
//!
//! Append-only log of pushed/popped events; the live queue is whatever
//! has been pushed and not yet popped, in push order. Popping appends a
//! popped marker immediately, so a consumer crash after the pop loses
//! the job (at-most-once delivery).

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::Job;

use super::{JobQueue, QueueError};

/// One line in the queue log
#[derive(Debug, Clone, Serialize, Deserialize)]
struct QueueEvent {
    /// When this event was written
    timestamp: DateTime<Utc>,

    /// What happened
    #[serde(flatten)]
    kind: QueueEventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
enum QueueEventKind {
    /// Job appended to the tail
    Pushed { entry_id: Uuid, job: Job },

    /// Job removed from the head
    Popped { entry_id: Uuid },
}

/// JSONL-based durable FIFO queue
pub struct JsonlJobQueue {
    /// Path to the jobs.jsonl file
    log_path: PathBuf,

    /// Serializes check-then-append pop sequences
    pop_lock: Mutex<()>,

    /// How long an idle dequeue sleeps between polls
    poll_interval: Duration,
}

impl JsonlJobQueue {
    /// Create a queue backed by the given log file.
    pub fn new(log_path: PathBuf) -> Self {
        Self {
            log_path,
            pop_lock: Mutex::new(()),
            poll_interval: Duration::from_millis(500),
        }
    }

    /// Open a queue, creating the parent directory if needed.
    pub async fn open(log_path: PathBuf) -> Result<Self, QueueError> {
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(Self::new(log_path))
    }

    /// Override the idle poll interval (tests use a short one).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Append an event to the log
    async fn append_event(&self, event: &QueueEvent) -> Result<(), QueueError> {
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

    /// Replay the log into the live queue, head first.
    async fn replay(&self) -> Result<Vec<(Uuid, Job)>, QueueError> {
        let mut live: Vec<(Uuid, Job)> = Vec::new();

        if !self.log_path.exists() {
            return Ok(live);
        }

        let file = File::open(&self.log_path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let event: QueueEvent = serde_json::from_str(&line)?;
            match event.kind {
                QueueEventKind::Pushed { entry_id, job } => {
                    live.push((entry_id, job));
                }
                QueueEventKind::Popped { entry_id } => {
                    live.retain(|(id, _)| *id != entry_id);
                }
            }
        }

        Ok(live)
    }
}

#[async_trait]
impl JobQueue for JsonlJobQueue {
    async fn enqueue(&self, job: &Job) -> Result<(), QueueError> {
        let event = QueueEvent {
            timestamp: Utc::now(),
            kind: QueueEventKind::Pushed {
                entry_id: Uuid::new_v4(),
                job: job.clone(),
            },
        };
        self.append_event(&event).await?;

        tracing::debug!(call_id = %job.call_id, "Job enqueued");
        Ok(())
    }

    async fn dequeue(&self) -> Result<Job, QueueError> {
        loop {
            if let Some(job) = self.try_dequeue().await? {
                return Ok(job);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn try_dequeue(&self) -> Result<Option<Job>, QueueError> {
        let _guard = self.pop_lock.lock().await;

        let live = self.replay().await?;
        let (entry_id, job) = match live.into_iter().next() {
            Some(head) => head,
            None => return Ok(None),
        };

        self.append_event(&QueueEvent {
            timestamp: Utc::now(),
            kind: QueueEventKind::Popped { entry_id },
        })
        .await?;

        Ok(Some(job))
    }

    async fn pending(&self) -> Result<usize, QueueError> {
        Ok(self.replay().await?.len())
    }
}
