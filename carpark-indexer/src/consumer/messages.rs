//! Message types for the consumer.
//!
//! Defines the record and control structures that flow through the ingest.

use carpark_indexer_shared::CarparkRecord;

/// A message read from the queue whose payload decoded successfully.
///
/// The raw payload bytes are carried alongside the decoded record: the
/// decoded form is only used for document addressing, while the payload is
/// what gets persisted.
#[derive(Debug, Clone)]
pub struct ConsumedRecord {
    /// The message key, if present (log purposes only).
    pub key: Option<String>,
    /// The raw payload bytes, exactly as read from the queue.
    pub payload: Vec<u8>,
    /// The decoded record.
    pub record: CarparkRecord,
    /// Source partition, for diagnostics.
    pub partition: i32,
    /// Source offset, for diagnostics.
    pub offset: i64,
}

/// Messages that flow through the ingest.
#[derive(Debug)]
pub enum StreamMessage {
    /// A batch of decoded records with associated offsets for acknowledgment.
    Records {
        records: Vec<ConsumedRecord>,
        offsets: Vec<(String, i32, i64)>,
    },
    /// Acknowledgment that records were successfully exported.
    Acknowledgment {
        offsets: Vec<(String, i32, i64)>,
        success: bool,
        error: Option<String>,
    },
    /// Stream has ended.
    End,
    /// An error occurred.
    Error(String),
}
