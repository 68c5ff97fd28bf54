//! Transition-ordering tests.
//!
//! Every stage boundary is a separate persisted write, so the record
//! log must show the exact path a job took. These tests run real jobs
//! through the worker and assert on the replayed history.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use callflow::domain::AnalysisResults;
use callflow::pipeline::{Analyzer, SimulatedAnalyzer, SimulatedTranscriber};
use callflow::queue::JsonlJobQueue;
use callflow::store::records::RecordEventKind;
use callflow::store::{FsBlobStore, JsonlRecordStore};
use callflow::{CallStatus, Job, JobQueue, Producer, RecordStore, Worker};

struct Rig {
    producer: Producer,
    records: Arc<JsonlRecordStore>,
    queue: Arc<JsonlJobQueue>,
    blobs: Arc<FsBlobStore>,
    _temp: TempDir,
}

async fn create_rig() -> Rig {
    let temp = TempDir::new().unwrap();
    let records = Arc::new(JsonlRecordStore::new(temp.path().join("calls.jsonl")));
    let blobs = Arc::new(
        FsBlobStore::open(temp.path().join("blobs"))
            .await
            .unwrap(),
    );
    let queue = Arc::new(
        JsonlJobQueue::new(temp.path().join("jobs.jsonl"))
            .with_poll_interval(Duration::from_millis(10)),
    );
    let producer = Producer::new(records.clone(), blobs.clone(), queue.clone());

    Rig {
        producer,
        records,
        queue,
        blobs,
        _temp: temp,
    }
}

fn simulated_worker(rig: &Rig) -> Worker {
    Worker::new(
        rig.queue.clone(),
        rig.records.clone(),
        Arc::new(SimulatedTranscriber::new(rig.blobs.clone())),
        Arc::new(SimulatedAnalyzer::new()),
    )
}

/// Flatten a record's history into the status sequence it walked.
fn status_path(history: &[callflow::store::records::RecordEvent]) -> Vec<CallStatus> {
    history
        .iter()
        .map(|event| match &event.kind {
            RecordEventKind::Created { record } => record.status,
            RecordEventKind::StatusChanged { status } => *status,
            RecordEventKind::Completed { .. } => CallStatus::Completed,
            RecordEventKind::Failed { .. } => CallStatus::Failed,
        })
        .collect()
}

#[tokio::test]
async fn test_happy_path_walks_every_stage_in_order() {
    let rig = create_rig().await;
    let worker = simulated_worker(&rig);

    let call_id = rig
        .producer
        .store_upload("call1.wav", b"audio")
        .await
        .unwrap();
    worker.run_once().await.unwrap();

    let history = rig.records.history(&call_id).await.unwrap();
    assert_eq!(
        status_path(&history),
        vec![
            CallStatus::Pending,
            CallStatus::Processing,
            CallStatus::Transcribing,
            CallStatus::Analyzing,
            CallStatus::Completed,
        ]
    );

    // Timestamps never go backwards within a record's history
    for pair in history.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

#[tokio::test]
async fn test_transcription_fault_stops_before_analyzing() {
    let rig = create_rig().await;
    let worker = simulated_worker(&rig);

    let call_id = rig
        .producer
        .store_upload("call1.wav", b"audio")
        .await
        .unwrap();

    let record = rig.records.get(&call_id).await.unwrap().unwrap();
    tokio::fs::remove_file(rig._temp.path().join("blobs").join(&record.blob_path))
        .await
        .unwrap();

    worker.run_once().await.unwrap();

    let history = rig.records.history(&call_id).await.unwrap();
    assert_eq!(
        status_path(&history),
        vec![
            CallStatus::Pending,
            CallStatus::Processing,
            CallStatus::Transcribing,
            CallStatus::Failed,
        ]
    );
}

struct RefusingAnalyzer;

#[async_trait]
impl Analyzer for RefusingAnalyzer {
    fn name(&self) -> &str {
        "refusing"
    }

    async fn analyze(&self, _transcript: &str) -> anyhow::Result<AnalysisResults> {
        anyhow::bail!("llm backend unavailable")
    }
}

#[tokio::test]
async fn test_analysis_fault_records_the_stage_it_reached() {
    let rig = create_rig().await;
    let worker = Worker::new(
        rig.queue.clone(),
        rig.records.clone(),
        Arc::new(SimulatedTranscriber::new(rig.blobs.clone())),
        Arc::new(RefusingAnalyzer),
    );

    let call_id = rig
        .producer
        .store_upload("call1.wav", b"audio")
        .await
        .unwrap();
    worker.run_once().await.unwrap();

    let history = rig.records.history(&call_id).await.unwrap();
    assert_eq!(
        status_path(&history),
        vec![
            CallStatus::Pending,
            CallStatus::Processing,
            CallStatus::Transcribing,
            CallStatus::Analyzing,
            CallStatus::Failed,
        ]
    );

    let record = rig.records.get(&call_id).await.unwrap().unwrap();
    assert_eq!(
        record.processing_error.as_deref(),
        Some("llm backend unavailable")
    );
}

#[tokio::test]
async fn test_terminal_records_never_move_again() {
    let rig = create_rig().await;
    let worker = simulated_worker(&rig);

    let call_id = rig
        .producer
        .store_upload("call1.wav", b"audio")
        .await
        .unwrap();
    worker.run_once().await.unwrap();

    let before = rig.records.history(&call_id).await.unwrap().len();

    // Re-delivering the same call id is a no-op on the record
    rig.queue
        .enqueue(&Job::new(call_id.clone()))
        .await
        .unwrap();
    worker.run_once().await.unwrap();

    let after = rig.records.history(&call_id).await.unwrap().len();
    assert_eq!(before, after);

    let record = rig.records.get(&call_id).await.unwrap().unwrap();
    assert_eq!(record.status, CallStatus::Completed);
}
