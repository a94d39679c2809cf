//! Record decoder.
//!
//! Structural decoding of raw message payloads into [`CarparkRecord`]s. The
//! decode is a minimal parse target: field values are not validated, and
//! fields outside the declared shape are left to the raw payload.

use carpark_indexer_shared::CarparkRecord;

use crate::errors::IngestError;

/// Decode a raw payload into a carpark record.
///
/// The source position is captured in the error so a skipped message can be
/// located in the topic.
///
/// # Arguments
///
/// * `payload` - The raw message payload bytes
/// * `partition` - Source partition, for diagnostics
/// * `offset` - Source offset, for diagnostics
///
/// # Returns
///
/// * `Ok(CarparkRecord)` - The decoded record
/// * `Err(IngestError::DecodeError)` - If the payload is structurally malformed
pub fn decode_record(
    payload: &[u8],
    partition: i32,
    offset: i64,
) -> Result<CarparkRecord, IngestError> {
    serde_json::from_slice(payload)
        .map_err(|e| IngestError::decode(partition, offset, e.to_string()))
}
