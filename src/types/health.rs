//! Venue health types

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct VenueHealth {
    pub venue: String,
    pub reachable: bool,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}
