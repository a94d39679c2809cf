//! Processor module for the carpark indexer ingest.
//!
//! Maps decoded records into indexable documents.

mod record_processor;

pub use record_processor::RecordProcessor;
