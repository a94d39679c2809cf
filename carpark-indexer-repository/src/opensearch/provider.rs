//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate. Documents are written through the bulk
//! API, one request per flush, with per-document outcomes parsed out of the
//! bulk response.

use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    auth::Credentials,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    BulkOperation, BulkOperations, BulkParts, OpenSearch,
};
use serde_json::{value::RawValue, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::IndexConfig;
use crate::types::{BatchOperationResult, BatchOperationSummary, IndexDocumentRequest};

/// Default bound on a single request round-trip.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the OpenSearch transport.
///
/// Credentials are optional; when both username and password are present,
/// requests carry basic authentication. The request timeout bounds the whole
/// round-trip (connect plus response), which is the transport's equivalent of
/// separate dial/response-header bounds.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Basic-auth username.
    pub username: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
    /// Bound on a single request round-trip.
    pub request_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// OpenSearch provider implementation.
///
/// Writes upsert-style "index" actions addressed by (index name, document
/// id). The index name is resolved once at construction and never changes
/// for the provider's lifetime.
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "https://localhost:9200")
    /// * `settings` - Transport settings: credentials and request timeout
    /// * `index_config` - The resolved target index
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub fn new(
        url: &str,
        settings: ConnectionSettings,
        index_config: IndexConfig,
    ) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(settings.request_timeout);

        if let (Some(username), Some(password)) = (settings.username, settings.password) {
            builder = builder.auth(Credentials::Basic(username, password));
        }

        let transport = builder
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            index = %index_config.name,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    fn index_name(&self) -> &str {
        &self.index_config.name
    }

    /// Write a batch of documents through the bulk API.
    ///
    /// Bodies are raw JSON text and are passed to the backend verbatim, so
    /// the stored source is byte-identical to the submitted payload. The bulk
    /// response is parsed into per-document outcomes; individual rejections
    /// never fail the call.
    async fn bulk_index_documents(
        &self,
        requests: &[IndexDocumentRequest],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if requests.is_empty() {
            return Ok(BatchOperationSummary::empty());
        }

        let mut operations = BulkOperations::new();
        for request in requests {
            // RawValue keeps the body verbatim instead of re-serializing it.
            let body = RawValue::from_string(request.body.clone()).map_err(|e| {
                SearchIndexError::validation(format!(
                    "Document {} body is not valid JSON: {}",
                    request.document_id, e
                ))
            })?;
            operations
                .push(BulkOperation::index(body).id(request.document_id.as_str()))
                .map_err(|e| SearchIndexError::serialization(e.to_string()))?;
        }

        let response = self
            .client
            .bulk(BulkParts::Index(&self.index_config.name))
            .body(vec![operations])
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchIndexError::bulk_index(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let summary = summarize_bulk_response(&body, requests);
        debug!(
            index = %self.index_config.name,
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk request completed"
        );
        Ok(summary)
    }
}

/// Parse a bulk response body into per-document outcomes.
///
/// Bulk response items come back in submission order; each is matched to its
/// request by position. An item carrying an `error` object (or a missing
/// item) is reported as a rejection for that document only.
fn summarize_bulk_response(
    response: &Value,
    requests: &[IndexDocumentRequest],
) -> BatchOperationSummary {
    let items = response.get("items").and_then(Value::as_array);

    let mut results = Vec::with_capacity(requests.len());
    let mut succeeded = 0;
    let mut failed = 0;

    for (position, request) in requests.iter().enumerate() {
        let entry = items
            .and_then(|items| items.get(position))
            .and_then(|item| item.get("index"));

        let error = match entry {
            Some(entry) => {
                let status = entry
                    .get("status")
                    .and_then(Value::as_u64)
                    .unwrap_or_default() as u16;
                match entry.get("error") {
                    Some(detail) => {
                        let reason = detail
                            .get("reason")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| detail.to_string());
                        Some(SearchIndexError::document_rejected(status, reason))
                    }
                    None => None,
                }
            }
            None => Some(SearchIndexError::parse(
                "Bulk response is missing an item for this document",
            )),
        };

        let success = error.is_none();
        if success {
            succeeded += 1;
        } else {
            failed += 1;
        }
        results.push(BatchOperationResult {
            document_id: request.document_id.clone(),
            success,
            error,
        });
    }

    BatchOperationSummary {
        total: requests.len(),
        succeeded,
        failed,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(id: &str) -> IndexDocumentRequest {
        IndexDocumentRequest {
            document_id: id.to_string(),
            body: format!(r#"{{"carpark_number":"{}"}}"#, id),
        }
    }

    #[test]
    fn test_summarize_all_succeeded() {
        let requests = vec![request("a"), request("b")];
        let response = json!({
            "took": 3,
            "errors": false,
            "items": [
                {"index": {"_id": "a", "status": 201, "result": "created"}},
                {"index": {"_id": "b", "status": 200, "result": "updated"}}
            ]
        });

        let summary = summarize_bulk_response(&response, &requests);

        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
        assert!(summary.results.iter().all(|r| r.success));
    }

    #[test]
    fn test_summarize_reports_single_conflict() {
        let requests = vec![request("a"), request("b"), request("c")];
        let response = json!({
            "took": 5,
            "errors": true,
            "items": [
                {"index": {"_id": "a", "status": 201}},
                {"index": {"_id": "b", "status": 409, "error": {
                    "type": "version_conflict_engine_exception",
                    "reason": "version conflict, document already exists"
                }}},
                {"index": {"_id": "c", "status": 201}}
            ]
        });

        let summary = summarize_bulk_response(&response, &requests);

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);

        let rejected = &summary.results[1];
        assert_eq!(rejected.document_id, "b");
        assert!(!rejected.success);
        match rejected.error.as_ref().unwrap() {
            SearchIndexError::DocumentRejected { status, reason } => {
                assert_eq!(*status, 409);
                assert!(reason.contains("version conflict"));
            }
            other => panic!("Expected DocumentRejected, got {:?}", other),
        }
    }

    #[test]
    fn test_summarize_preserves_submission_order() {
        let requests = vec![request("first"), request("second"), request("third")];
        let response = json!({
            "errors": false,
            "items": [
                {"index": {"_id": "first", "status": 201}},
                {"index": {"_id": "second", "status": 201}},
                {"index": {"_id": "third", "status": 201}}
            ]
        });

        let summary = summarize_bulk_response(&response, &requests);

        let ids: Vec<&str> = summary
            .results
            .iter()
            .map(|r| r.document_id.as_str())
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_summarize_error_without_reason_keeps_detail() {
        let requests = vec![request("a")];
        let response = json!({
            "errors": true,
            "items": [
                {"index": {"_id": "a", "status": 400, "error": {"type": "mapper_parsing_exception"}}}
            ]
        });

        let summary = summarize_bulk_response(&response, &requests);

        assert_eq!(summary.failed, 1);
        let error = summary.results[0].error.as_ref().unwrap().to_string();
        assert!(error.contains("mapper_parsing_exception"));
    }

    #[test]
    fn test_summarize_missing_items_marked_failed() {
        let requests = vec![request("a"), request("b")];
        let response = json!({
            "errors": false,
            "items": [
                {"index": {"_id": "a", "status": 201}}
            ]
        });

        let summary = summarize_bulk_response(&response, &requests);

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert!(matches!(
            summary.results[1].error,
            Some(SearchIndexError::ParseError(_))
        ));
    }
}
