//! Orchestrator module for the carpark indexer ingest.
//!
//! Drives the consume loop: coordinates the consumer, processor and loader
//! components, tracks progress, and owns graceful shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::{ConsumedRecord, StreamMessage};
use crate::errors::IngestError;
use crate::loader::SearchLoader;
use crate::processor::RecordProcessor;

/// Lifecycle states of the consume loop.
///
/// `Running` consumes and exports; `Draining` has observed a shutdown signal
/// and stops after the in-flight iteration; `Stopped` means the consumer has
/// been closed and no further work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Running,
    Draining,
    Stopped,
}

/// Abstracts the queue consumer so the orchestrator can be driven by mock
/// implementations in tests.
#[async_trait::async_trait]
pub trait Consumer: Send + Sync {
    /// Subscribe to the configured topic. Failure here is fatal: the loop
    /// never starts.
    fn subscribe(&self) -> Result<(), IngestError>;

    /// Consume until the stream ends or shutdown is signaled, sending record
    /// batches through `sender` and committing offsets acknowledged on
    /// `ack_receiver`.
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        ack_receiver: mpsc::Receiver<StreamMessage>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError>;
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the message channel buffer.
    pub channel_buffer_size: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 1000,
        }
    }
}

/// Orchestrator that coordinates the ingest components.
///
/// The orchestrator:
/// - Manages the lifecycle of ingest components
/// - Routes record batches from the consumer through processor and loader
/// - Acknowledges exported batches so their offsets get committed
/// - Handles shutdown signals
pub struct Orchestrator {
    consumer: Arc<dyn Consumer>,
    processor: RecordProcessor,
    loader: SearchLoader,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
    /// Total number of successfully decoded records since startup.
    total_records_consumed: Arc<AtomicU64>,
    /// Total number of documents exported since startup.
    total_documents_exported: Arc<AtomicU64>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(consumer: Arc<dyn Consumer>, processor: RecordProcessor, loader: SearchLoader) -> Self {
        Self::with_config(consumer, processor, loader, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        consumer: Arc<dyn Consumer>,
        processor: RecordProcessor,
        loader: SearchLoader,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            consumer,
            processor,
            loader,
            config,
            shutdown_tx,
            total_records_consumed: Arc::new(AtomicU64::new(0)),
            total_documents_exported: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Run the orchestrator.
    ///
    /// This method starts the consumer and drives the consume loop. It blocks
    /// until the stream ends, a shutdown signal is received, or a fatal error
    /// occurs. A batch-level export failure is fatal: the affected offsets are
    /// not committed and the error propagates out.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), IngestError> {
        info!("Starting carpark indexer orchestrator");

        // Subscribe to the topic before spawning the consumer task
        self.consumer.subscribe()?;

        // Create event channel
        let (event_transmitter, mut event_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        // Create acknowledgment channel
        let (ack_transmitter, ack_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        // Start consumer in background
        let consumer = Arc::clone(&self.consumer);
        let shutdown_rx = self.shutdown_tx.subscribe();

        let consumer_handle = tokio::spawn(async move {
            if let Err(e) = consumer
                .run(event_transmitter, ack_receiver, shutdown_rx)
                .await
            {
                error!(error = %e, "Consumer error");
            }
        });

        let mut state = PipelineState::Running;
        info!(state = ?state, "Ready to process records from Kafka");

        let mut sigterm =
            signal(SignalKind::terminate()).map_err(|e| IngestError::signal(e.to_string()))?;

        // Set up progress logging timer (every 10 seconds)
        let total_records = Arc::clone(&self.total_records_consumed);
        let total_docs = Arc::clone(&self.total_documents_exported);
        let mut progress_timer = interval(Duration::from_secs(10));
        progress_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Track previous values for rate calculation
        let mut prev_records: u64 = 0;
        let mut prev_docs: u64 = 0;
        let mut prev_time = std::time::Instant::now();

        let mut run_error: Option<IngestError> = None;

        loop {
            tokio::select! {
                msg = event_receiver.recv() => {
                    match msg {
                        Some(StreamMessage::Records { records, offsets }) => {
                            debug!(
                                record_count = records.len(),
                                offset_count = offsets.len(),
                                "Received record batch from consumer"
                            );
                            match self.process_records(records).await {
                                Ok(()) => {
                                    // Send success acknowledgment
                                    let _ = ack_transmitter.send(StreamMessage::Acknowledgment {
                                        offsets,
                                        success: true,
                                        error: None,
                                    }).await;
                                }
                                Err(e) => {
                                    // Batch-level export failure: NACK so the
                                    // offsets stay uncommitted, then terminate
                                    error!(error = %e, "Failed to export batch; terminating");
                                    let _ = ack_transmitter.send(StreamMessage::Acknowledgment {
                                        offsets,
                                        success: false,
                                        error: Some(e.to_string()),
                                    }).await;
                                    state = PipelineState::Draining;
                                    info!(state = ?state, "Draining pipeline after fatal export failure");
                                    let _ = self.shutdown_tx.send(());
                                    run_error = Some(e);
                                    break;
                                }
                            }
                        }
                        Some(StreamMessage::Error(e)) => {
                            error!(error = %e, "Received error from consumer");
                        }
                        Some(StreamMessage::End) | None => {
                            state = PipelineState::Draining;
                            info!(state = ?state, "Consumer stream ended");
                            break;
                        }
                        Some(StreamMessage::Acknowledgment { .. }) => {
                            // Ignore acknowledgments received on the wrong channel
                            warn!("Received acknowledgment on event channel (should be on ack channel)");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received interrupt signal");
                    state = PipelineState::Draining;
                    info!(state = ?state, "Draining pipeline");
                    let _ = self.shutdown_tx.send(());
                    break;
                }
                _ = sigterm.recv() => {
                    info!("Received terminate signal");
                    state = PipelineState::Draining;
                    info!(state = ?state, "Draining pipeline");
                    let _ = self.shutdown_tx.send(());
                    break;
                }
                _ = progress_timer.tick() => {
                    let records = total_records.load(Ordering::Relaxed);
                    let docs = total_docs.load(Ordering::Relaxed);

                    // Calculate rates per second
                    let now = std::time::Instant::now();
                    let elapsed_secs = now.duration_since(prev_time).as_secs_f64();

                    let records_per_sec = if elapsed_secs > 0.0 {
                        (records.saturating_sub(prev_records) as f64) / elapsed_secs
                    } else {
                        0.0
                    };

                    let docs_per_sec = if elapsed_secs > 0.0 {
                        (docs.saturating_sub(prev_docs) as f64) / elapsed_secs
                    } else {
                        0.0
                    };

                    info!(
                        records_consumed = records,
                        documents_exported = docs,
                        records_per_sec = format!("{:.2}", records_per_sec),
                        documents_per_sec = format!("{:.2}", docs_per_sec),
                        "Processing progress"
                    );

                    // Update previous values for next calculation
                    prev_records = records;
                    prev_docs = docs;
                    prev_time = now;
                }
            }
        }

        // Pending documents are not flushed on shutdown: their offsets were
        // never committed, so they will be re-consumed on the next startup
        // (at-least-once delivery semantics).

        // Wait for the consumer to finish; dropping it closes the queue
        // consumer and releases group membership
        let _ = consumer_handle.await;
        state = PipelineState::Stopped;

        let final_records = self.total_records_consumed.load(Ordering::Relaxed);
        let final_docs = self.total_documents_exported.load(Ordering::Relaxed);
        info!(
            state = ?state,
            total_records_consumed = final_records,
            total_documents_exported = final_docs,
            "Orchestrator shutdown complete"
        );

        match run_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Process a batch of records through the ingest.
    ///
    /// Documents are flushed to the search index before returning Ok, so the
    /// caller only acknowledges (and the consumer only commits) offsets whose
    /// documents are actually exported.
    async fn process_records(&mut self, records: Vec<ConsumedRecord>) -> Result<(), IngestError> {
        for record in &records {
            let total = self.total_records_consumed.fetch_add(1, Ordering::Relaxed) + 1;
            info!(
                key = record.key.as_deref().unwrap_or(""),
                value = %String::from_utf8_lossy(&record.payload),
                total_count = total,
                "Consumed record"
            );
        }

        let documents = self.processor.process_batch(records);

        if documents.is_empty() {
            debug!("No documents to export after processing");
            return Ok(());
        }

        let document_count = documents.len() as u64;

        // Load into the pending buffer, then flush before acknowledging
        self.loader.load(documents).await?;
        self.loader.flush().await?;

        self.total_documents_exported
            .fetch_add(document_count, Ordering::Relaxed);

        Ok(())
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Obtain a handle that can trigger shutdown from another task, including
    /// while `run` holds the orchestrator exclusively.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }
}
