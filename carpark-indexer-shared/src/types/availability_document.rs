//! Availability document types for the search index.
//!
//! This module defines the document form that is written to the search
//! backend: a stable document id derived from the ingestion minute plus the
//! original payload bytes.

use chrono::NaiveDateTime;

/// Format of the ingestion-minute prefix in document ids.
const DOCUMENT_ID_MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Document representation for the search index.
///
/// The body is the raw payload bytes exactly as read from the queue. The
/// document id is keyed by processing time truncated to the minute, so two
/// records for the same carpark processed within the same minute overwrite
/// each other at the backend (upsert-by-id idempotence).
///
/// # Fields
///
/// - `carpark_number`: The carpark identifier the document addresses
/// - `document_id`: `"<YYYY-MM-DD HH:MM>-<carpark_number>"`
/// - `body`: The original payload bytes, persisted unmodified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityDocument {
    pub carpark_number: String,
    pub document_id: String,
    pub body: Vec<u8>,
}

impl AvailabilityDocument {
    /// Create a new document for a record ingested at the given wall-clock
    /// time.
    ///
    /// # Arguments
    ///
    /// * `carpark_number` - The carpark identifier from the decoded record
    /// * `ingested_at` - Local wall-clock time at processing
    /// * `body` - The raw payload bytes
    pub fn new(
        carpark_number: impl Into<String>,
        ingested_at: NaiveDateTime,
        body: Vec<u8>,
    ) -> Self {
        let carpark_number = carpark_number.into();
        let document_id = Self::document_id_for(ingested_at, &carpark_number);
        Self {
            carpark_number,
            document_id,
            body,
        }
    }

    /// Derive the document id for a (processing time, carpark number) pair.
    ///
    /// The time is truncated to minute granularity, so the id is
    /// deterministic for all records of one carpark within the same minute.
    pub fn document_id_for(ingested_at: NaiveDateTime, carpark_number: &str) -> String {
        format!(
            "{}-{}",
            ingested_at.format(DOCUMENT_ID_MINUTE_FORMAT),
            carpark_number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_document_id_format() {
        assert_eq!(
            AvailabilityDocument::document_id_for(at(10, 0, 0), "A1"),
            "2024-01-01 10:00-A1"
        );
    }

    #[test]
    fn test_document_id_truncates_to_minute() {
        let first = AvailabilityDocument::document_id_for(at(10, 5, 3), "A1");
        let second = AvailabilityDocument::document_id_for(at(10, 5, 59), "A1");

        assert_eq!(first, second);
        assert_eq!(first, "2024-01-01 10:05-A1");
    }

    #[test]
    fn test_document_id_differs_across_minutes() {
        let first = AvailabilityDocument::document_id_for(at(10, 5, 59), "A1");
        let second = AvailabilityDocument::document_id_for(at(10, 6, 0), "A1");

        assert_ne!(first, second);
    }

    #[test]
    fn test_new_keeps_body_unmodified() {
        let payload = br#"{"carpark_number":"A1","extra":"kept"}"#.to_vec();
        let doc = AvailabilityDocument::new("A1", at(10, 0, 0), payload.clone());

        assert_eq!(doc.body, payload);
        assert_eq!(doc.document_id, "2024-01-01 10:00-A1");
        assert_eq!(doc.carpark_number, "A1");
    }
}
