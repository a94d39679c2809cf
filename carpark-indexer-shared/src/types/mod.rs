//! This module defines the core data structures used across the carpark
//! availability indexer. It re-exports the record and document types.

pub mod availability_document;
pub mod carpark_record;

pub use availability_document::AvailabilityDocument;
pub use carpark_record::{CarparkLotInfo, CarparkRecord};
