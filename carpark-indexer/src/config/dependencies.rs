//! Dependency initialization and wiring for the carpark indexer.

use std::sync::Arc;

use chrono::Local;
use tracing::info;

use crate::config::IndexerSettings;
use crate::consumer::KafkaConsumer;
use crate::loader::{LoaderConfig, SearchLoader};
use crate::orchestrator::Orchestrator;
use crate::processor::RecordProcessor;
use crate::IndexingError;
use carpark_indexer_repository::opensearch::IndexConfig;
use carpark_indexer_repository::{ConnectionSettings, OpenSearchProvider};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails
    pub async fn new() -> Result<Self, IndexingError> {
        Self::from_settings(IndexerSettings::from_env())
    }

    /// Initialize all dependencies from explicit settings.
    pub fn from_settings(settings: IndexerSettings) -> Result<Self, IndexingError> {
        info!(
            kafka_broker = %settings.kafka_broker,
            kafka_group_id = %settings.kafka_group_id,
            kafka_topic = %settings.kafka_topic,
            opensearch_url = %settings.opensearch_url,
            index_name_template = %settings.index_name_template,
            batch_size = settings.batch_size,
            "Initializing dependencies"
        );

        // Resolve the target index once, from the process start time. It does
        // not roll over if the process runs across a month boundary.
        let index_config =
            IndexConfig::from_template(&settings.index_name_template, Local::now().date_naive());
        info!(index = %index_config.name, "Resolved target index");

        // Initialize OpenSearch provider
        let connection_settings = ConnectionSettings {
            username: settings.opensearch_username.clone(),
            password: settings.opensearch_password.clone(),
            request_timeout: settings.opensearch_request_timeout,
        };
        let search_provider = OpenSearchProvider::new(
            &settings.opensearch_url,
            connection_settings,
            index_config,
        )
        .map_err(|e| {
            IndexingError::config(format!("Failed to create OpenSearch provider: {}", e))
        })?;

        // Initialize Kafka consumer
        let consumer = KafkaConsumer::with_batch_config(
            &settings.kafka_broker,
            &settings.kafka_group_id,
            &settings.kafka_client_id,
            &settings.kafka_topic,
            settings.batch_size,
            settings.batch_timeout_ms,
        )
        .map_err(|e| IndexingError::config(format!("Failed to create Kafka consumer: {}", e)))?;

        info!("Kafka consumer created");

        // Initialize processor
        let processor = RecordProcessor::new();

        // Initialize loader with search provider
        let loader = SearchLoader::with_config(
            Arc::new(search_provider),
            LoaderConfig {
                batch_size: settings.batch_size,
                flush_workers: settings.bulk_flush_workers,
            },
        );

        // Create orchestrator
        let orchestrator = Orchestrator::new(Arc::new(consumer), processor, loader);

        Ok(Self { orchestrator })
    }
}
