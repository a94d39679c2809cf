//! Decoded carpark availability record.
//!
//! This module defines the minimal parse target for the wire payload. The
//! decode shape is deliberately narrower than the wire contract: fields not
//! declared here are still persisted, because the indexer writes the original
//! payload bytes rather than a re-serialization of this struct.

use serde::Deserialize;

/// Lot-type availability entry within a carpark record.
///
/// All counts are string-typed in the wire format and are not validated as
/// numeric by the indexer.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CarparkLotInfo {
    /// Total number of lots of this type.
    #[serde(default)]
    pub total_lots: String,
    /// Lot type identifier (e.g. "C").
    #[serde(default)]
    pub lot_type: String,
    /// Number of currently available lots of this type.
    #[serde(default)]
    pub lots_available: String,
}

/// A decoded carpark availability record.
///
/// Missing fields default to their empty values, mirroring the tolerant
/// decode of the upstream feed: a payload decodes successfully as long as it
/// is structurally valid JSON of the declared shape.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CarparkRecord {
    /// Per-lot-type availability entries.
    #[serde(default)]
    pub carpark_info: Vec<CarparkLotInfo>,
    /// The carpark identifier (e.g. "A1").
    #[serde(default)]
    pub carpark_number: String,
    /// Update timestamp as reported by the feed, kept as an opaque string.
    #[serde(default)]
    pub update_datetime: String,
}
