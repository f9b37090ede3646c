use serde::{Deserialize, Serialize};

/// Canonical apartment listing extracted from one source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    /// `{source_prefix}_{native_id}`, stable across scans
    pub id: String,
    pub rooms: f64,
    pub area_sqm: f64,
    /// Always absolute
    pub link: String,
    pub rent: Option<String>,
    pub title: Option<String>,
    pub address: Option<String>,
    /// Human-readable provider name
    pub source: String,
}

/// Build the dedupe key for a listing
pub fn listing_id(prefix: &str, native_id: &str) -> String {
    format!("{}_{}", prefix, native_id.trim())
}
