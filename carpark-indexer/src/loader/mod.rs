//! Loader module for the carpark indexer ingest.
//!
//! Buffers documents and flushes them to the search index in batches,
//! decoupling per-record processing latency from backend round-trip cost.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::IngestError;
use carpark_indexer_repository::{IndexDocumentRequest, SearchIndexProvider};
use carpark_indexer_shared::AvailabilityDocument;

/// Configuration for the search loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Number of documents to batch before flushing.
    pub batch_size: usize,
    /// Number of concurrent flush workers. Recognized configuration; flushes
    /// execute sequentially, which is what preserves submission order.
    pub flush_workers: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            flush_workers: 1,
        }
    }
}

/// Loader that exports documents into the search index.
///
/// The loader is responsible for:
/// - Batching documents for efficient bulk indexing
/// - Reporting per-document outcomes without aborting the batch
pub struct SearchLoader {
    provider: Arc<dyn SearchIndexProvider>,
    config: LoaderConfig,
    pending: Vec<IndexDocumentRequest>,
}

impl SearchLoader {
    /// Create a new search loader with the given provider.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self::with_config(provider, LoaderConfig::default())
    }

    /// Create a new search loader with custom configuration.
    pub fn with_config(provider: Arc<dyn SearchIndexProvider>, config: LoaderConfig) -> Self {
        if config.flush_workers > 1 {
            warn!(
                flush_workers = config.flush_workers,
                "More than one flush worker requested; flushes run one at a time so submission order is preserved"
            );
        }
        let batch_size = config.batch_size;
        Self {
            provider,
            config,
            pending: Vec::with_capacity(batch_size),
        }
    }

    /// Load a batch of documents into the pending buffer.
    ///
    /// Documents are flushed automatically when the buffer reaches the
    /// configured batch size.
    #[instrument(skip(self, documents), fields(document_count = documents.len()))]
    pub async fn load(&mut self, documents: Vec<AvailabilityDocument>) -> Result<(), IngestError> {
        for doc in documents {
            let body = String::from_utf8(doc.body).map_err(|e| {
                IngestError::loader(format!(
                    "Document {} body is not valid UTF-8: {}",
                    doc.document_id, e
                ))
            })?;
            self.pending.push(IndexDocumentRequest {
                document_id: doc.document_id,
                body,
            });
        }

        // Flush if we've reached batch size
        if self.pending.len() >= self.config.batch_size {
            self.flush().await?;
        }

        Ok(())
    }

    /// Flush all pending documents to the search index.
    ///
    /// Individual rejections are logged and reported without failing the
    /// flush; a batch-level transport failure is returned as an error.
    #[instrument(skip(self))]
    pub async fn flush(&mut self) -> Result<(), IngestError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let requests: Vec<IndexDocumentRequest> = self.pending.drain(..).collect();
        let count = requests.len();

        debug!(
            count = count,
            index = %self.provider.index_name(),
            "Flushing documents to search index"
        );

        match self.provider.bulk_index_documents(&requests).await {
            Ok(summary) => {
                if summary.failed > 0 {
                    warn!(
                        succeeded = summary.succeeded,
                        failed = summary.failed,
                        "Bulk export completed with some rejections"
                    );
                    // Log individual rejections
                    for result in summary.results.iter().filter(|r| !r.success) {
                        if let Some(ref err) = result.error {
                            error!(
                                document_id = %result.document_id,
                                error = %err,
                                "Document rejected by search backend"
                            );
                        }
                    }
                } else {
                    info!(
                        count = summary.succeeded,
                        index = %self.provider.index_name(),
                        "Exported documents to search index"
                    );
                }
                Ok(())
            }
            Err(e) => {
                error!(error = %e, count = count, "Failed to export batch to search index");
                Err(IngestError::loader(format!(
                    "Failed to export batch of {} documents: {}",
                    count, e
                )))
            }
        }
    }

    /// Number of documents currently buffered and not yet flushed.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use carpark_indexer_repository::{
        BatchOperationResult, BatchOperationSummary, SearchIndexError,
    };
    use chrono::NaiveDate;
    use std::sync::Mutex;

    /// Mock search provider for testing.
    struct MockSearchProvider {
        indexed_ids: Mutex<Vec<String>>,
        reject_id: Option<String>,
        fail_transport: bool,
    }

    impl MockSearchProvider {
        fn new() -> Self {
            Self {
                indexed_ids: Mutex::new(Vec::new()),
                reject_id: None,
                fail_transport: false,
            }
        }

        fn rejecting(document_id: &str) -> Self {
            Self {
                reject_id: Some(document_id.to_string()),
                ..Self::new()
            }
        }

        fn failing_transport() -> Self {
            Self {
                fail_transport: true,
                ..Self::new()
            }
        }

        fn indexed(&self) -> Vec<String> {
            self.indexed_ids.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchIndexProvider for MockSearchProvider {
        fn index_name(&self) -> &str {
            "carpark-availability-2024-01"
        }

        async fn bulk_index_documents(
            &self,
            requests: &[IndexDocumentRequest],
        ) -> Result<BatchOperationSummary, SearchIndexError> {
            if self.fail_transport {
                return Err(SearchIndexError::connection("connection refused"));
            }

            let mut results = Vec::new();
            let mut succeeded = 0;
            let mut failed = 0;
            for request in requests {
                let rejected = self.reject_id.as_deref() == Some(request.document_id.as_str());
                if rejected {
                    failed += 1;
                } else {
                    succeeded += 1;
                    self.indexed_ids
                        .lock()
                        .unwrap()
                        .push(request.document_id.clone());
                }
                results.push(BatchOperationResult {
                    document_id: request.document_id.clone(),
                    success: !rejected,
                    error: rejected
                        .then(|| SearchIndexError::document_rejected(409, "version conflict")),
                });
            }
            Ok(BatchOperationSummary {
                total: requests.len(),
                succeeded,
                failed,
                results,
            })
        }
    }

    fn document(carpark_number: &str, minute: u32) -> AvailabilityDocument {
        AvailabilityDocument::new(
            carpark_number,
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(10, minute, 0)
                .unwrap(),
            format!(r#"{{"carpark_number":"{}"}}"#, carpark_number).into_bytes(),
        )
    }

    #[tokio::test]
    async fn test_load_and_flush() {
        let provider = Arc::new(MockSearchProvider::new());
        let mut loader = SearchLoader::new(provider.clone());

        loader
            .load(vec![document("A1", 0), document("B2", 0)])
            .await
            .unwrap();
        assert_eq!(loader.pending_count(), 2);

        loader.flush().await.unwrap();

        assert_eq!(loader.pending_count(), 0);
        assert_eq!(provider.indexed().len(), 2);
    }

    #[tokio::test]
    async fn test_auto_flush_at_batch_size() {
        let provider = Arc::new(MockSearchProvider::new());
        let mut loader = SearchLoader::with_config(
            provider.clone(),
            LoaderConfig {
                batch_size: 2,
                flush_workers: 1,
            },
        );

        loader
            .load(vec![document("A1", 0), document("B2", 0)])
            .await
            .unwrap();

        // Threshold reached, buffer flushed without an explicit flush call
        assert_eq!(loader.pending_count(), 0);
        assert_eq!(provider.indexed().len(), 2);
    }

    #[tokio::test]
    async fn test_flush_preserves_submission_order() {
        let provider = Arc::new(MockSearchProvider::new());
        let mut loader = SearchLoader::new(provider.clone());

        loader
            .load(vec![document("A1", 0), document("B2", 1), document("C3", 2)])
            .await
            .unwrap();
        loader.flush().await.unwrap();

        assert_eq!(
            provider.indexed(),
            vec![
                "2024-01-01 10:00-A1",
                "2024-01-01 10:01-B2",
                "2024-01-01 10:02-C3"
            ]
        );
    }

    #[tokio::test]
    async fn test_per_document_rejection_does_not_fail_flush() {
        let provider = Arc::new(MockSearchProvider::rejecting("2024-01-01 10:01-B2"));
        let mut loader = SearchLoader::new(provider.clone());

        loader
            .load(vec![document("A1", 0), document("B2", 1), document("C3", 2)])
            .await
            .unwrap();

        // Rejection of one document is reported, not escalated
        loader.flush().await.unwrap();
        assert_eq!(provider.indexed().len(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_fails_flush() {
        let provider = Arc::new(MockSearchProvider::failing_transport());
        let mut loader = SearchLoader::new(provider);

        loader.load(vec![document("A1", 0)]).await.unwrap();

        let err = loader.flush().await.unwrap_err();
        assert!(matches!(err, IngestError::LoaderError(_)));
    }

    #[tokio::test]
    async fn test_flush_empty_buffer_is_noop() {
        let provider = Arc::new(MockSearchProvider::failing_transport());
        let mut loader = SearchLoader::new(provider);

        // Nothing pending, so the failing provider is never reached
        loader.flush().await.unwrap();
    }
}
