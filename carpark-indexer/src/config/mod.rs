//! Configuration and dependency initialization for the carpark indexer.

mod dependencies;
mod settings;

pub use dependencies::Dependencies;
pub use settings::IndexerSettings;
