//! # Carpark Indexer Shared
//!
//! This crate defines shared data structures and types used across the carpark
//! availability indexer. It includes the decoded wire record and the document
//! form produced for indexing.

pub mod types;

pub use types::availability_document::AvailabilityDocument;
pub use types::carpark_record::{CarparkLotInfo, CarparkRecord};
