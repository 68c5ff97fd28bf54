//! The worker loop: sole consumer of the job queue.
//!
//! Drives each job through the pipeline stages in order, persisting
//! every status transition, and isolates failures at the job boundary:
//! a faulting job marks its record Failed and the loop moves on. The
//! loop itself only stops on a shutdown signal, checked between jobs,
//! never mid-job.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::domain::{CallStatus, Job};
use crate::pipeline::{Analyzer, Transcriber};
use crate::queue::JobQueue;
use crate::store::RecordStore;

/// Outcome of one job cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Pipeline ran to Completed
    Completed,

    /// Claim lost (duplicate delivery or unknown record); nothing done
    Skipped,

    /// A stage faulted; record marked Failed
    Failed,
}

/// Queue consumer that drives jobs through the pipeline.
///
/// Holds long-lived injected handles; no per-job connection churn and
/// no state carried across iterations.
pub struct Worker {
    queue: Arc<dyn JobQueue>,
    records: Arc<dyn RecordStore>,
    transcriber: Arc<dyn Transcriber>,
    analyzer: Arc<dyn Analyzer>,
    idle_poll: Duration,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        records: Arc<dyn RecordStore>,
        transcriber: Arc<dyn Transcriber>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        Self {
            queue,
            records,
            transcriber,
            analyzer,
            idle_poll: Duration::from_millis(500),
        }
    }

    /// Override the idle poll interval (tests use a short one).
    pub fn with_idle_poll(mut self, interval: Duration) -> Self {
        self.idle_poll = interval;
        self
    }

    /// Run until a stop signal arrives.
    ///
    /// A pop writes a durable marker before the job is returned, so it
    /// must never run inside a cancellable future: only the idle sleep
    /// races the stop signal, and the stop is otherwise checked between
    /// jobs. An in-flight job always runs to a terminal status.
    pub async fn run(&self, mut stop_rx: mpsc::Receiver<()>) -> Result<()> {
        info!(
            transcriber = self.transcriber.name(),
            analyzer = self.analyzer.name(),
            "Worker started. Waiting for jobs..."
        );

        loop {
            if stop_rx.try_recv().is_ok() {
                info!("Worker stopping");
                return Ok(());
            }

            match self
                .queue
                .try_dequeue()
                .await
                .context("Job queue unreachable")?
            {
                Some(job) => {
                    self.handle_job(&job).await;
                }
                None => {
                    tokio::select! {
                        _ = stop_rx.recv() => {
                            info!("Worker stopping");
                            return Ok(());
                        }
                        _ = tokio::time::sleep(self.idle_poll) => {}
                    }
                }
            }
        }
    }

    /// Drain currently queued jobs, then return the number processed.
    pub async fn run_once(&self) -> Result<usize> {
        let mut processed = 0;

        while let Some(job) = self
            .queue
            .try_dequeue()
            .await
            .context("Job queue unreachable")?
        {
            self.handle_job(&job).await;
            processed += 1;
        }

        Ok(processed)
    }

    /// Spawn the worker on a dedicated task; stop via the handle.
    pub fn spawn(self: Arc<Self>) -> WorkerHandle {
        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            if let Err(e) = self.run(stop_rx).await {
                error!("Worker error: {}", e);
            }
        });

        WorkerHandle { stop_tx, task }
    }

    /// The failure isolation boundary: nothing a job does escapes here.
    pub async fn handle_job(&self, job: &Job) -> JobOutcome {
        info!(call_id = %job.call_id, "--- Processing job ---");

        match self.process_job(job).await {
            Ok(JobOutcome::Skipped) => {
                warn!(call_id = %job.call_id, "Claim lost, skipping job (duplicate delivery?)");
                JobOutcome::Skipped
            }
            Ok(outcome) => {
                info!(call_id = %job.call_id, "Job completed");
                outcome
            }
            Err(e) => {
                error!(call_id = %job.call_id, "Job failed: {:#}", e);

                if let Err(store_err) = self.records.fail(&job.call_id, &e.to_string()).await {
                    // Record may already be terminal or gone; the job is
                    // spent either way.
                    error!(
                        call_id = %job.call_id,
                        "Could not persist failure: {}", store_err
                    );
                }

                JobOutcome::Failed
            }
        }
    }

    /// One pipeline pass: claim, transcribe, analyze, complete.
    async fn process_job(&self, job: &Job) -> Result<JobOutcome> {
        // Claim the record before reading it; Pending → Processing only
        // succeeds once per record.
        if !self.records.begin_processing(&job.call_id).await? {
            return Ok(JobOutcome::Skipped);
        }

        let record = self
            .records
            .get(&job.call_id)
            .await?
            .with_context(|| format!("Call record disappeared: {}", job.call_id))?;

        self.records
            .set_status(&job.call_id, CallStatus::Transcribing)
            .await?;
        let transcript = self.transcriber.transcribe(&record.blob_path).await?;

        self.records
            .set_status(&job.call_id, CallStatus::Analyzing)
            .await?;
        let results = self.analyzer.analyze(&transcript).await?;

        self.records.complete(&job.call_id, results).await?;

        Ok(JobOutcome::Completed)
    }
}

/// Handle to a spawned worker
pub struct WorkerHandle {
    stop_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal the worker to stop after the current job and wait for it.
    pub async fn stop(self) -> Result<()> {
        let _ = self.stop_tx.send(()).await;
        self.task.await?;
        Ok(())
    }
}
