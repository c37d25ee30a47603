//! Structured selection report.
//!
//! This is the wire contract between the selector subprocess and the
//! trigger controller: the exact JSON shape printed on stdout in
//! `--format json` mode. Field names are stable; do not rename without
//! updating the invoker.

use serde::{Deserialize, Serialize};

/// Per-zone reading in a selection report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneReading {
    pub zone: String,
    /// Latest intensity, or `null` if the series is missing or the
    /// query failed for this zone.
    pub value: Option<f64>,
    /// Mapped cloud region, or `null` for an unmapped zone.
    pub region: Option<String>,
}

/// The winning zone of a selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestPick {
    pub zone: String,
    pub value: f64,
    /// `null` when the zone has no region mapping — still a valid pick.
    pub region: Option<String>,
}

/// Complete result of one selector invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionReport {
    pub metric: String,
    #[serde(rename = "backendURL")]
    pub backend_url: String,
    pub duration_ms: u64,
    pub zones: Vec<ZoneReading>,
    /// `null` when no zone has data or the minimum exceeds the ceiling.
    pub best: Option<BestPick>,
    pub max_ceiling: Option<f64>,
}
