//! Request and response types for search index operations.

use crate::errors::SearchIndexError;

/// Request to index (upsert) one document in the search index.
///
/// The `document_id` addresses the document; a write with an existing id
/// overwrites the stored document. The `body` is the document source as raw
/// JSON text, passed through to the backend without re-serialization.
#[derive(Debug, Clone)]
pub struct IndexDocumentRequest {
    /// The document's identifier within the index.
    pub document_id: String,
    /// The document source as raw JSON text.
    pub body: String,
}

/// Result of a bulk operation for a single document.
///
/// Indicates whether the write for one document succeeded and carries the
/// backend's rejection error if it failed.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// The document's identifier within the index.
    pub document_id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<SearchIndexError>,
}

/// Summary of a bulk operation containing aggregate statistics and
/// individual results.
///
/// Provides a complete overview of one bulk request: how many documents were
/// written, how many were rejected, and the per-document outcome for each.
/// This allows callers to handle partial failures gracefully.
#[derive(Debug, Clone)]
pub struct BatchOperationSummary {
    /// Total number of documents in the batch.
    pub total: usize,
    /// Number of successful writes.
    pub succeeded: usize,
    /// Number of rejected documents.
    pub failed: usize,
    /// Individual results for each document, in submission order.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// An empty summary for a batch with no documents.
    pub fn empty() -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            results: Vec::new(),
        }
    }
}
