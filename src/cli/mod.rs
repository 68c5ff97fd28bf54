//! Command-line interface for callflow.
//!
//! Provides commands for running the API server, running the worker,
//! and inspecting call records.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use crate::api::{ApiServer, AppState};
use crate::config::{Config, TranscriberBackend};
use crate::domain::CallStatus;
use crate::ingest::Producer;
use crate::pipeline::{SimulatedAnalyzer, SimulatedTranscriber, Transcriber, WhisperTranscriber};
use crate::queue::{JobQueue, JsonlJobQueue};
use crate::store::{BlobStore, FsBlobStore, JsonlRecordStore, RecordStore};
use crate::worker::Worker;

/// callflow - queue-driven call recording pipeline
#[derive(Parser, Debug)]
#[command(name = "callflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API server (upload producer)
    Serve {
        /// Address to bind to (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Run the worker loop
    Work {
        /// Drain the queue once and exit instead of running forever
        #[arg(long)]
        once: bool,
    },

    /// List call records
    Calls {
        /// Maximum number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show one call record and its transition history
    Status {
        /// Call ID
        call_id: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Long-lived handles, constructed once at startup and injected.
struct Handles {
    records: Arc<JsonlRecordStore>,
    blobs: Arc<FsBlobStore>,
    queue: Arc<JsonlJobQueue>,
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        let config = Config::load()?;

        match self.command {
            Commands::Serve { bind } => execute_serve(&config, bind).await,
            Commands::Work { once } => execute_work(&config, once).await,
            Commands::Calls { limit } => execute_calls(&config, limit).await,
            Commands::Status { call_id } => execute_status(&config, &call_id).await,
            Commands::Config => execute_config(&config),
        }
    }
}

/// Open all backends; any connection fault here is fatal.
async fn open_handles(config: &Config) -> Result<Handles> {
    let records = Arc::new(
        JsonlRecordStore::open(config.calls_log_path())
            .await
            .context("Failed to open record store")?,
    );
    let blobs = Arc::new(
        FsBlobStore::open(config.blobs_dir.clone())
            .await
            .context("Failed to open blob store")?,
    );
    let queue = Arc::new(
        JsonlJobQueue::open(config.jobs_log_path())
            .await
            .context("Failed to open job queue")?,
    );

    Ok(Handles {
        records,
        blobs,
        queue,
    })
}

fn build_transcriber(config: &Config, blobs: Arc<dyn BlobStore>) -> Arc<dyn Transcriber> {
    match config.pipeline.transcriber {
        TranscriberBackend::Simulated => Arc::new(SimulatedTranscriber::new(blobs)),
        TranscriberBackend::Whisper => Arc::new(WhisperTranscriber::new(
            blobs,
            config.pipeline.whisper_path.clone(),
            config.pipeline.whisper_model.clone(),
        )),
    }
}

async fn execute_serve(config: &Config, bind: Option<String>) -> Result<()> {
    let handles = open_handles(config).await?;

    let records: Arc<dyn RecordStore> = handles.records;
    let blobs: Arc<dyn BlobStore> = handles.blobs;
    let queue: Arc<dyn JobQueue> = handles.queue;

    let producer = Arc::new(Producer::new(records.clone(), blobs.clone(), queue));

    let state = AppState {
        producer,
        records,
        blobs,
    };

    let bind = bind.unwrap_or_else(|| config.bind.clone());
    ApiServer::new(bind, state).start().await
}

async fn execute_work(config: &Config, once: bool) -> Result<()> {
    let handles = open_handles(config).await?;

    let blobs: Arc<dyn BlobStore> = handles.blobs;
    let transcriber = build_transcriber(config, blobs);
    let analyzer = Arc::new(SimulatedAnalyzer::new());

    let worker = Worker::new(handles.queue, handles.records, transcriber, analyzer);

    if once {
        let processed = worker.run_once().await?;
        println!("Processed {} job(s)", processed);
        return Ok(());
    }

    // Ctrl+C requests a stop; the worker honors it between jobs
    let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        println!("\nShutting down after current job...");
        let _ = stop_tx.send(()).await;
    });

    worker.run(stop_rx).await
}

async fn execute_calls(config: &Config, limit: usize) -> Result<()> {
    let handles = open_handles(config).await?;
    let records = handles.records.list().await?;

    if records.is_empty() {
        println!("No call records");
        return Ok(());
    }

    for record in records.into_iter().take(limit) {
        println!(
            "{} {}  {}  {}",
            status_icon(record.status),
            record.id,
            record.upload_timestamp.format("%Y-%m-%d %H:%M"),
            record.original_filename
        );
    }

    Ok(())
}

async fn execute_status(config: &Config, call_id: &str) -> Result<()> {
    let handles = open_handles(config).await?;

    let record = handles
        .records
        .get(call_id)
        .await?
        .with_context(|| format!("Call {} not found", call_id))?;

    println!("Call:      {}", record.id);
    println!("File:      {}", record.original_filename);
    println!("Blob:      {}", record.blob_path);
    println!("Uploaded:  {}", record.upload_timestamp);
    println!("Status:    {:?}", record.status);

    if let Some(error) = &record.processing_error {
        println!("Error:     {}", error);
    }
    if let Some(results) = &record.analysis_results {
        println!("Summary:   {}", results.summary);
        println!("Sentiment: {:?}", results.sentiment);
        println!("Entities:");
        for entity in &results.entities {
            println!("  - {} ({})", entity.text, entity.entity_type);
        }
    }

    let history = handles.records.history(call_id).await?;
    if !history.is_empty() {
        println!("History:");
        for event in history {
            println!("  {}  {:?}", event.timestamp.format("%H:%M:%S"), event.kind);
        }
    }

    Ok(())
}

fn execute_config(config: &Config) -> Result<()> {
    println!("Home:        {}", config.home.display());
    println!("Blobs:       {}", config.blobs_dir.display());
    println!("Bind:        {}", config.bind);
    println!("Transcriber: {:?}", config.pipeline.transcriber);
    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none, using defaults)"),
    }
    Ok(())
}

fn status_icon(status: CallStatus) -> &'static str {
    match status {
        CallStatus::Pending => "⏳",
        CallStatus::Processing | CallStatus::Transcribing | CallStatus::Analyzing => "🔄",
        CallStatus::Completed => "✅",
        CallStatus::Failed => "❌",
    }
}
