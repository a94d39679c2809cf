//! Indexer settings.
//!
//! All runtime configuration is collected into an explicit settings struct
//! at startup and passed by value into the components that need it; there
//! are no process-wide mutable globals.

use std::env;
use std::time::Duration;

use carpark_indexer_repository::opensearch::DEFAULT_INDEX_TEMPLATE;

/// Default Kafka broker address.
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Default Kafka consumer group ID.
const DEFAULT_KAFKA_GROUP_ID: &str = "carpark-indexer";

/// Default Kafka client ID.
const DEFAULT_KAFKA_CLIENT_ID: &str = "1";

/// Default topic to consume from.
const DEFAULT_KAFKA_TOPIC: &str = "carpark-availability";

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default bound on an OpenSearch request round-trip, in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default number of records batched before a flush.
const DEFAULT_BATCH_SIZE: usize = 50;

/// Default maximum age of a partial batch, in milliseconds.
const DEFAULT_BATCH_TIMEOUT_MS: u64 = 1000;

/// Default number of bulk flush workers.
const DEFAULT_BULK_FLUSH_WORKERS: usize = 1;

/// Runtime configuration for the indexer.
#[derive(Debug, Clone)]
pub struct IndexerSettings {
    /// Kafka broker addresses (comma-separated).
    pub kafka_broker: String,
    /// Consumer group ID.
    pub kafka_group_id: String,
    /// Client ID reported to the broker.
    pub kafka_client_id: String,
    /// Topic to consume from.
    pub kafka_topic: String,
    /// OpenSearch server URL.
    pub opensearch_url: String,
    /// Basic-auth username for OpenSearch.
    pub opensearch_username: Option<String>,
    /// Basic-auth password for OpenSearch.
    pub opensearch_password: Option<String>,
    /// Bound on an OpenSearch request round-trip.
    pub opensearch_request_timeout: Duration,
    /// Index-name template; `{DATE}` resolves to year-month at startup.
    pub index_name_template: String,
    /// Number of records batched before a flush.
    pub batch_size: usize,
    /// Maximum age of a partial batch before it is flushed anyway.
    pub batch_timeout_ms: u64,
    /// Number of bulk flush workers (flushes stay sequential at the default
    /// of one, which is what preserves end-to-end ordering).
    pub bulk_flush_workers: usize,
}

impl IndexerSettings {
    /// Read settings from environment variables, falling back to defaults.
    ///
    /// # Environment Variables
    ///
    /// - `KAFKA_BROKER`: Kafka broker address (default: localhost:9092)
    /// - `KAFKA_GROUP_ID`: Consumer group ID (default: carpark-indexer)
    /// - `KAFKA_CLIENT_ID`: Client ID (default: 1)
    /// - `KAFKA_TOPIC`: Topic name (default: carpark-availability)
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `OPENSEARCH_USERNAME` / `OPENSEARCH_PASSWORD`: basic credentials
    /// - `OPENSEARCH_REQUEST_TIMEOUT_SECS`: request timeout (default: 30)
    /// - `INDEX_NAME_TEMPLATE`: index-name template with `{DATE}` placeholder
    ///   (default: carpark-availability-{DATE})
    /// - `BATCH_SIZE`: records per batch (default: 50)
    /// - `BATCH_TIMEOUT_MS`: partial-batch flush timeout (default: 1000)
    /// - `BULK_FLUSH_WORKERS`: flush worker count (default: 1)
    pub fn from_env() -> Self {
        Self {
            kafka_broker: env::var("KAFKA_BROKER")
                .unwrap_or_else(|_| DEFAULT_KAFKA_BROKER.to_string()),
            kafka_group_id: env::var("KAFKA_GROUP_ID")
                .unwrap_or_else(|_| DEFAULT_KAFKA_GROUP_ID.to_string()),
            kafka_client_id: env::var("KAFKA_CLIENT_ID")
                .unwrap_or_else(|_| DEFAULT_KAFKA_CLIENT_ID.to_string()),
            kafka_topic: env::var("KAFKA_TOPIC")
                .unwrap_or_else(|_| DEFAULT_KAFKA_TOPIC.to_string()),
            opensearch_url: env::var("OPENSEARCH_URL")
                .unwrap_or_else(|_| DEFAULT_OPENSEARCH_URL.to_string()),
            opensearch_username: env::var("OPENSEARCH_USERNAME").ok(),
            opensearch_password: env::var("OPENSEARCH_PASSWORD").ok(),
            opensearch_request_timeout: Duration::from_secs(
                env::var("OPENSEARCH_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            index_name_template: env::var("INDEX_NAME_TEMPLATE")
                .unwrap_or_else(|_| DEFAULT_INDEX_TEMPLATE.to_string()),
            batch_size: env::var("BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(DEFAULT_BATCH_SIZE),
            batch_timeout_ms: env::var("BATCH_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_BATCH_TIMEOUT_MS),
            bulk_flush_workers: env::var("BULK_FLUSH_WORKERS")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(DEFAULT_BULK_FLUSH_WORKERS),
        }
    }
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self {
            kafka_broker: DEFAULT_KAFKA_BROKER.to_string(),
            kafka_group_id: DEFAULT_KAFKA_GROUP_ID.to_string(),
            kafka_client_id: DEFAULT_KAFKA_CLIENT_ID.to_string(),
            kafka_topic: DEFAULT_KAFKA_TOPIC.to_string(),
            opensearch_url: DEFAULT_OPENSEARCH_URL.to_string(),
            opensearch_username: None,
            opensearch_password: None,
            opensearch_request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            index_name_template: DEFAULT_INDEX_TEMPLATE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_timeout_ms: DEFAULT_BATCH_TIMEOUT_MS,
            bulk_flush_workers: DEFAULT_BULK_FLUSH_WORKERS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = IndexerSettings::default();

        assert_eq!(settings.kafka_topic, "carpark-availability");
        assert_eq!(settings.index_name_template, "carpark-availability-{DATE}");
        assert_eq!(settings.bulk_flush_workers, 1);
        assert!(settings.opensearch_username.is_none());
    }
}
