//! Kafka consumer implementation for the carpark indexer.
//!
//! Consumes availability records from the configured topic, decodes them and
//! forwards batches to the orchestrator. Offsets are committed only after the
//! orchestrator acknowledges a successful export, so auto-commit stays off
//! and at-least-once delivery holds across the flush boundary.

use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    message::{BorrowedMessage, Message as KafkaMessage},
    TopicPartitionList,
};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument};

use crate::consumer::decoder::decode_record;
use crate::consumer::messages::{ConsumedRecord, StreamMessage};
use crate::errors::IngestError;
use crate::orchestrator;

/// Default batch size for Kafka message batching.
const DEFAULT_BATCH_SIZE: usize = 50;

/// Default batch timeout in milliseconds.
const DEFAULT_BATCH_TIMEOUT_MS: u64 = 1000;

/// Kafka consumer for carpark availability records.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    topic: String,
    batch_size: usize,
    batch_timeout: Duration,
}

impl KafkaConsumer {
    /// Create a new Kafka consumer with default batch configuration.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Kafka broker addresses (comma-separated)
    /// * `group_id` - Consumer group ID
    /// * `client_id` - Client ID reported to the broker
    /// * `topic` - Topic to consume from
    ///
    /// # Returns
    ///
    /// * `Ok(KafkaConsumer)` - A new consumer instance
    /// * `Err(IngestError)` - If consumer creation fails
    pub fn new(
        brokers: &str,
        group_id: &str,
        client_id: &str,
        topic: &str,
    ) -> Result<Self, IngestError> {
        Self::with_batch_config(
            brokers,
            group_id,
            client_id,
            topic,
            DEFAULT_BATCH_SIZE,
            DEFAULT_BATCH_TIMEOUT_MS,
        )
    }

    /// Create a new Kafka consumer with custom batch configuration.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Kafka broker addresses (comma-separated)
    /// * `group_id` - Consumer group ID
    /// * `client_id` - Client ID reported to the broker
    /// * `topic` - Topic to consume from
    /// * `batch_size` - Number of records to batch before sending
    /// * `batch_timeout_ms` - Maximum time to wait before flushing a partial batch (milliseconds)
    pub fn with_batch_config(
        brokers: &str,
        group_id: &str,
        client_id: &str,
        topic: &str,
        batch_size: usize,
        batch_timeout_ms: u64,
    ) -> Result<Self, IngestError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("client.id", client_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(
            brokers = %brokers,
            group_id = %group_id,
            client_id = %client_id,
            topic = %topic,
            batch_size = batch_size,
            batch_timeout_ms = batch_timeout_ms,
            "Created Kafka consumer with batching"
        );

        Ok(Self {
            consumer,
            topic: topic.to_string(),
            batch_size,
            batch_timeout: Duration::from_millis(batch_timeout_ms),
        })
    }

    /// Flush a batch of decoded records to the channel.
    async fn flush_batch(
        &self,
        batch: &[ConsumedRecord],
        offsets: &[(String, i32, i64)],
        sender: &mpsc::Sender<StreamMessage>,
    ) -> Result<(), IngestError> {
        if batch.is_empty() {
            return Ok(());
        }

        info!(
            record_count = batch.len(),
            offset_count = offsets.len(),
            "Sending batch of records to processor"
        );
        sender
            .send(StreamMessage::Records {
                records: batch.to_vec(),
                offsets: offsets.to_vec(),
            })
            .await
            .map_err(|e| IngestError::channel(e.to_string()))?;

        Ok(())
    }

    /// Commit offsets for a batch of acknowledged messages.
    async fn commit_offsets(&self, offsets: &[(String, i32, i64)]) -> Result<(), IngestError> {
        if offsets.is_empty() {
            return Ok(());
        }

        let mut tpl = TopicPartitionList::new();
        for (topic, partition, offset) in offsets {
            tpl.add_partition_offset(topic, *partition, rdkafka::Offset::Offset(offset + 1))
                .map_err(|e| IngestError::kafka(e.to_string()))?;
        }

        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        Ok(())
    }

    /// Commit a single message's offset immediately.
    ///
    /// Used for messages that produce no work (empty or malformed payloads):
    /// they are consumed and must not be re-read on restart.
    fn commit_message_offset(&self, msg: &BorrowedMessage<'_>) -> Result<(), IngestError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            msg.topic(),
            msg.partition(),
            rdkafka::Offset::Offset(msg.offset() + 1),
        )
        .map_err(|e| IngestError::kafka(e.to_string()))?;
        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| IngestError::kafka(e.to_string()))?;
        Ok(())
    }

    /// Parse a Kafka message into a decoded record.
    ///
    /// Returns `Ok(None)` for messages with no payload. A malformed payload
    /// is a decode error; the caller drops the message.
    fn parse_message(
        &self,
        msg: &BorrowedMessage<'_>,
    ) -> Result<Option<ConsumedRecord>, IngestError> {
        let payload = match msg.payload() {
            Some(p) => p,
            None => {
                debug!(
                    partition = msg.partition(),
                    offset = msg.offset(),
                    "Received message with empty payload"
                );
                return Ok(None);
            }
        };

        let record = decode_record(payload, msg.partition(), msg.offset())?;

        Ok(Some(ConsumedRecord {
            key: msg.key().map(|k| String::from_utf8_lossy(k).into_owned()),
            payload: payload.to_vec(),
            record,
            partition: msg.partition(),
            offset: msg.offset(),
        }))
    }
}

#[async_trait::async_trait]
impl orchestrator::Consumer for KafkaConsumer {
    /// Subscribe to the configured topic.
    fn subscribe(&self) -> Result<(), IngestError> {
        self.consumer
            .subscribe(&[self.topic.as_str()])
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(topic = %self.topic, "Subscribed to Kafka topic");
        Ok(())
    }

    /// Start consuming messages and send decoded batches through the channel.
    ///
    /// Records are batched by size or timeout, whichever happens first.
    ///
    /// # Arguments
    ///
    /// * `sender` - Channel to send record batches to
    /// * `ack_receiver` - Channel to receive acknowledgments from the orchestrator
    /// * `shutdown` - Shutdown signal receiver
    #[instrument(skip(self, sender, ack_receiver, shutdown))]
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        use futures::StreamExt;

        let mut message_stream = self.consumer.stream();
        let mut batch: Vec<ConsumedRecord> = Vec::with_capacity(self.batch_size);
        let mut pending_offsets: Vec<(String, i32, i64)> = Vec::new();
        let mut flush_timer = tokio::time::interval(self.batch_timeout);
        flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // Skip the first tick immediately
        flush_timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Consumer received shutdown signal");
                    // Don't flush pending records - their offsets haven't been
                    // committed and they will be re-read on restart
                    let _ = sender.send(StreamMessage::End).await;
                    break;
                }
                // Handle acknowledgments from orchestrator
                ack_msg = ack_receiver.recv() => {
                    match ack_msg {
                        Some(StreamMessage::Acknowledgment { offsets, success, error }) => {
                            if success {
                                if let Err(e) = self.commit_offsets(&offsets).await {
                                    error!(error = %e, "Failed to commit offsets after acknowledgment");
                                } else {
                                    debug!(offset_count = offsets.len(), "Committed offsets after successful export");
                                }
                            } else {
                                error!(
                                    offset_count = offsets.len(),
                                    error = error.as_deref().unwrap_or("Unknown error"),
                                    "Not committing offsets due to export failure"
                                );
                            }
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Acknowledgment channel closed");
                            break;
                        }
                        _ => {
                            // Ignore other message types
                        }
                    }
                }
                message = message_stream.next() => {
                    match message {
                        Some(Ok(msg)) => {
                            debug!(
                                topic = %msg.topic(),
                                partition = msg.partition(),
                                offset = msg.offset(),
                                "Received message from Kafka"
                            );
                            match self.parse_message(&msg) {
                                Ok(Some(record)) => {
                                    batch.push(record);
                                    pending_offsets.push((msg.topic().to_string(), msg.partition(), msg.offset()));

                                    // Flush if batch is full
                                    if batch.len() >= self.batch_size {
                                        let offsets_to_send = pending_offsets.clone();
                                        self.flush_batch(&batch, &offsets_to_send, &sender).await?;
                                        batch.clear();
                                        pending_offsets.clear();
                                    }
                                }
                                Ok(None) => {
                                    // Empty payload: commit immediately so we
                                    // don't re-read a message that carries no work
                                    if let Err(e) = self.commit_message_offset(&msg) {
                                        error!(error = %e, "Failed to commit offset for empty message");
                                    }
                                }
                                Err(e) => {
                                    // Malformed payload: log, drop, keep the
                                    // pipeline alive. The offset counts as
                                    // consumed.
                                    error!(
                                        topic = %msg.topic(),
                                        partition = msg.partition(),
                                        offset = msg.offset(),
                                        error = %e,
                                        "Failed to decode message; dropping"
                                    );
                                    if let Err(e) = self.commit_message_offset(&msg) {
                                        error!(error = %e, "Failed to commit offset for dropped message");
                                    }
                                }
                            }
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Kafka error");
                            let _ = sender.send(StreamMessage::Error(e.to_string())).await;
                        }
                        None => {
                            info!("Kafka stream ended");
                            // Flush any pending records
                            if !batch.is_empty() {
                                let offsets_to_send = pending_offsets.clone();
                                self.flush_batch(&batch, &offsets_to_send, &sender).await?;
                            }
                            let _ = sender.send(StreamMessage::End).await;
                            break;
                        }
                    }
                }
                _ = flush_timer.tick() => {
                    // Flush if timeout reached and we have pending records
                    if !batch.is_empty() {
                        debug!(count = batch.len(), "Flushing batch due to timeout");
                        let offsets_to_send = pending_offsets.clone();
                        self.flush_batch(&batch, &offsets_to_send, &sender).await?;
                        batch.clear();
                        pending_offsets.clear();
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_defaults() {
        assert_eq!(DEFAULT_BATCH_SIZE, 50);
        assert_eq!(DEFAULT_BATCH_TIMEOUT_MS, 1000);
    }
}
