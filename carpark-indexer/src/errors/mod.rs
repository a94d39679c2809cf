//! Error types for the carpark indexer ingest.

use thiserror::Error;

/// Errors that can occur in the carpark indexer ingest.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Error from the loader component. Batch-level flush failures are fatal
    /// to the process under the baseline policy.
    #[error("Loader error: {0}")]
    LoaderError(String),

    /// Kafka-related error.
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// A message payload failed structural decoding. Non-fatal: the message
    /// is logged and dropped.
    #[error("Decode error at partition {partition} offset {offset}: {message}")]
    DecodeError {
        partition: i32,
        offset: i64,
        message: String,
    },

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Failed to install a process signal handler.
    #[error("Signal error: {0}")]
    SignalError(String),
}

impl IngestError {
    /// Create a loader error.
    pub fn loader(msg: impl Into<String>) -> Self {
        Self::LoaderError(msg.into())
    }

    /// Create a Kafka error.
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }

    /// Create a decode error carrying the message's source position.
    pub fn decode(partition: i32, offset: i64, msg: impl Into<String>) -> Self {
        Self::DecodeError {
            partition,
            offset,
            message: msg.into(),
        }
    }

    /// Create a channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::ChannelError(msg.into())
    }

    /// Create a signal error.
    pub fn signal(msg: impl Into<String>) -> Self {
        Self::SignalError(msg.into())
    }
}

impl From<rdkafka::error::KafkaError> for IngestError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}
