//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch,
//! Elasticsearch, etc.).

use async_trait::async_trait;

use crate::errors::SearchIndexError;
use crate::types::{BatchOperationSummary, IndexDocumentRequest};

/// Abstracts the underlying search index implementation (OpenSearch,
/// Elasticsearch, etc.).
///
/// Implementations are injected into the loader to enable dependency
/// injection and easy testing with mock implementations.
///
/// # Note on Document Creation
///
/// There is no separate create/update distinction: every write is an
/// upsert-style "index" action addressed by document id. Writing an id that
/// already exists overwrites the stored document.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// The resolved name of the index all writes are addressed to.
    ///
    /// The name is computed once at provider construction and does not change
    /// for the provider's lifetime.
    fn index_name(&self) -> &str;

    /// Write a batch of documents in one bulk request and return a summary of
    /// successful and rejected documents.
    ///
    /// Individual rejections (conflict, malformed document) are reported in
    /// the summary and never fail the call. The call itself fails only for
    /// batch-level problems: transport failures, a non-success bulk response,
    /// or an unparseable response body.
    ///
    /// # Arguments
    ///
    /// * `requests` - Documents to write, in submission order
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Aggregate statistics plus per-document
    ///   results, in submission order
    /// * `Err(SearchIndexError)` - If the bulk request fails as a whole
    async fn bulk_index_documents(
        &self,
        requests: &[IndexDocumentRequest],
    ) -> Result<BatchOperationSummary, SearchIndexError>;
}
