//! Core data types shared by the cookie, ledger, and beacon modules.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A cookie written to the outbound response.
///
/// Records are created by [`CookieStore::write`](crate::cookies::CookieStore::write)
/// and [`CookieStore::delete`](crate::cookies::CookieStore::delete). A later
/// write for the same name replaces the earlier record wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieRecord {
    pub name: String,
    /// Signed token, or the deletion sentinel `0`.
    pub value: String,
    pub expires: DateTime<Utc>,
    pub path: String,
}

/// A single conversion attributed to the current visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionEvent {
    pub sku: String,
    pub value: String,
}

/// Everything needed to emit one beacon.
///
/// Built by [`BeaconBuilder::build`](crate::beacon::BeaconBuilder::build);
/// discarded once rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconRequest {
    pub endpoint: String,
    pub site_id: String,
    pub visitor_id: String,
    pub referrer: Option<String>,
    pub conversions: Vec<ConversionEvent>,
}
