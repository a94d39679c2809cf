//! Consumer module for the carpark indexer ingest.
//!
//! Provides Kafka consumer functionality for receiving and decoding carpark
//! availability records.

mod decoder;
mod kafka_consumer;
mod messages;

pub use decoder::decode_record;
pub use kafka_consumer::KafkaConsumer;
pub use messages::{ConsumedRecord, StreamMessage};
