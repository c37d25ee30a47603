//! Domain types for the zone state store.

use serde::{Deserialize, Serialize};

/// Where a zone's current intensity value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensitySource {
    /// No observation yet (startup default).
    Initial,
    /// Fetched from the carbon-intensity provider.
    Provider,
    /// Operator-supplied manual override.
    Override,
}

/// Latest known carbon intensity for a single zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneRecord {
    /// Intensity in gCO2eq/kWh.
    pub value: f64,
    /// Provenance of the value.
    pub source: IntensitySource,
    /// Unix timestamp (seconds) of the observation; 0 if never observed.
    pub observed_at: u64,
}

impl Default for ZoneRecord {
    fn default() -> Self {
        Self {
            value: 0.0,
            source: IntensitySource::Initial,
            observed_at: 0,
        }
    }
}
