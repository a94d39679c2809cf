//! Record processor implementation.
//!
//! Maps consumed records into [`AvailabilityDocument`]s for indexing. The
//! mapping is pure given (record, raw payload, wall-clock time) and cannot
//! fail for a record that passed the decoder: the document body is the
//! original payload bytes, not a re-serialization, so fields outside the
//! decode shape are persisted faithfully.

use chrono::{Local, NaiveDateTime};
use tracing::{debug, instrument};

use crate::consumer::ConsumedRecord;
use carpark_indexer_shared::AvailabilityDocument;

/// Processor that maps consumed records into search documents.
pub struct RecordProcessor {
    // Could hold configuration or caches in the future
}

impl RecordProcessor {
    /// Create a new record processor.
    pub fn new() -> Self {
        Self {}
    }

    /// Map a batch of consumed records into documents.
    ///
    /// All records in the batch share one processing timestamp; the document
    /// id only carries minute granularity.
    ///
    /// # Arguments
    ///
    /// * `records` - The records to map
    ///
    /// # Returns
    ///
    /// A vector of documents ready for loading, in submission order.
    #[instrument(skip(self, records), fields(record_count = records.len()))]
    pub fn process_batch(&self, records: Vec<ConsumedRecord>) -> Vec<AvailabilityDocument> {
        let now = Local::now().naive_local();

        let documents: Vec<AvailabilityDocument> = records
            .into_iter()
            .map(|record| self.map_record(record, now))
            .collect();

        debug!(document_count = documents.len(), "Mapped record batch");
        documents
    }

    /// Map a single consumed record into a document.
    pub(crate) fn map_record(
        &self,
        consumed: ConsumedRecord,
        now: NaiveDateTime,
    ) -> AvailabilityDocument {
        AvailabilityDocument::new(consumed.record.carpark_number, now, consumed.payload)
    }
}

impl Default for RecordProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::decode_record;
    use chrono::NaiveDate;

    fn consumed(payload: &[u8]) -> ConsumedRecord {
        ConsumedRecord {
            key: None,
            payload: payload.to_vec(),
            record: decode_record(payload, 0, 42).unwrap(),
            partition: 0,
            offset: 42,
        }
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_map_record_scenario() {
        let payload =
            br#"{"carpark_number":"A1","update_datetime":"2024-01-01T10:00","carpark_info":[]}"#;
        let processor = RecordProcessor::new();

        let doc = processor.map_record(consumed(payload), at(10, 0));

        assert_eq!(doc.document_id, "2024-01-01 10:00-A1");
        assert_eq!(doc.body, payload.to_vec());
    }

    #[test]
    fn test_map_record_body_round_trips_unmodified() {
        // Whitespace, field order and undeclared fields survive because the
        // body is the raw payload, not a re-serialization.
        let payload = br#"{ "update_datetime":"x",  "carpark_number":"B2", "undeclared":1 }"#;
        let processor = RecordProcessor::new();

        let doc = processor.map_record(consumed(payload), at(9, 30));

        assert_eq!(doc.body, payload.to_vec());
    }

    #[test]
    fn test_same_minute_same_carpark_collides() {
        let payload = br#"{"carpark_number":"A1"}"#;
        let processor = RecordProcessor::new();

        let first = processor.map_record(consumed(payload), at(10, 5));
        let second = processor.map_record(consumed(payload), at(10, 5));

        assert_eq!(first.document_id, second.document_id);
    }

    #[test]
    fn test_process_batch_preserves_order() {
        let processor = RecordProcessor::new();
        let records = vec![
            consumed(br#"{"carpark_number":"A1"}"#),
            consumed(br#"{"carpark_number":"B2"}"#),
            consumed(br#"{"carpark_number":"C3"}"#),
        ];

        let documents = processor.process_batch(records);

        let numbers: Vec<&str> = documents
            .iter()
            .map(|d| d.carpark_number.as_str())
            .collect();
        assert_eq!(numbers, vec!["A1", "B2", "C3"]);
    }
}
