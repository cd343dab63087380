//! Stop directory records
//!
//! The provider publishes a full stop directory (one XML document for the
//! whole network). Entries carry the id, display name, coordinates, and a raw
//! status flag; there is no per-stop line list on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One entry of the provider's stop directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopInfo {
    /// Provider-assigned stop identifier
    pub id: String,
    /// Official stop name
    pub name: String,
    /// Latitude coordinate
    pub latitude: f64,
    /// Longitude coordinate
    pub longitude: f64,
    /// Raw status flag as published by the provider
    pub status: String,
}

impl StopInfo {
    /// Case-insensitive substring match on the stop name, for search
    #[must_use]
    pub fn matches_name(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(&query.trim().to_lowercase())
    }
}

impl fmt::Display for StopInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
