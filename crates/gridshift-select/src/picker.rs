//! Zone ranking and region resolution.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};

use crate::query::PromClient;
use crate::report::{BestPick, SelectionReport, ZoneReading};

/// Errors loading a region map file.
#[derive(Debug, Error)]
pub enum RegionMapError {
    #[error("failed to read region map {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid region map {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Static zone → cloud region mapping, loaded once at startup.
#[derive(Debug)]
pub struct RegionMap {
    regions: BTreeMap<String, String>,
}

impl RegionMap {
    /// Load from a JSON object file, or fall back to the built-in table.
    pub fn load(path: Option<&Path>) -> Result<Self, RegionMapError> {
        let regions = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| RegionMapError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                serde_json::from_str(&text).map_err(|source| RegionMapError::Parse {
                    path: path.display().to_string(),
                    source,
                })?
            }
            None => Self::builtin(),
        };
        Ok(Self { regions })
    }

    /// Default table for common electricity-map zones.
    fn builtin() -> BTreeMap<String, String> {
        [
            ("AT", "europe-west3"),
            ("DE", "europe-west3"),
            ("FR", "europe-west1"),
            ("NL", "europe-west4"),
            ("DK-DK1", "europe-north1"),
            ("SE-SE3", "europe-north1"),
            ("NO-NO2", "europe-north1"),
            ("IE", "europe-west1"),
            ("US-CENT-SWPP", "us-central1"),
        ]
        .into_iter()
        .map(|(z, r)| (z.to_string(), r.to_string()))
        .collect()
    }

    /// Cloud region for a zone, if mapped.
    pub fn region(&self, zone: &str) -> Option<&str> {
        self.regions.get(zone).map(String::as_str)
    }
}

/// Pick the zone with the strictly smallest present value.
///
/// Ties are broken by earliest position in the input list (stable linear
/// minimum scan). Returns `None` when no zone has a value, or when a
/// ceiling is supplied and the minimum exceeds it — the caller must
/// treat "nothing acceptable" identically to "no data at all."
pub fn pick_greenest(
    readings: &[(String, Option<f64>)],
    ceiling: Option<f64>,
) -> Option<(String, f64)> {
    let mut best: Option<(&str, f64)> = None;
    for (zone, value) in readings {
        let Some(v) = value else { continue };
        match best {
            Some((_, b)) if *v >= b => {} // first-seen wins on ties
            _ => best = Some((zone, *v)),
        }
    }

    let (zone, value) = best?;
    if let Some(c) = ceiling
        && value > c
    {
        return None;
    }
    Some((zone.to_string(), value))
}

/// Parameters for one selection run.
pub struct SelectParams {
    pub metric: String,
    pub zones: Vec<String>,
    pub ceiling: Option<f64>,
}

/// Query every candidate zone, rank, and build the full report.
///
/// Each zone is independent: a missing series or a failed query yields
/// `null` for that zone only, never a fatal error for the whole call.
pub async fn select(
    client: &PromClient,
    regions: &RegionMap,
    params: &SelectParams,
) -> SelectionReport {
    let start = Instant::now();
    let mut readings: Vec<(String, Option<f64>)> = Vec::with_capacity(params.zones.len());

    for zone in &params.zones {
        let value = match client.instant_query(&params.metric, zone).await {
            Ok(v) => v,
            Err(e) => {
                warn!(%zone, error = %e, "zone query failed; treating as no data");
                None
            }
        };
        readings.push((zone.clone(), value));
    }

    let best = pick_greenest(&readings, params.ceiling).map(|(zone, value)| {
        let region = regions.region(&zone).map(str::to_string);
        BestPick { zone, value, region }
    });

    let zones = readings
        .into_iter()
        .map(|(zone, value)| {
            let region = regions.region(&zone).map(str::to_string);
            ZoneReading { zone, value, region }
        })
        .collect();

    let report = SelectionReport {
        metric: params.metric.clone(),
        backend_url: client.base_url().to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
        zones,
        best,
        max_ceiling: params.ceiling,
    };

    for reading in &report.zones {
        match reading.value {
            Some(v) => info!(
                zone = %reading.zone,
                value = v,
                region = reading.region.as_deref().unwrap_or("-"),
                "zone intensity"
            ),
            None => info!(zone = %reading.zone, "zone intensity unavailable"),
        }
    }

    report
}
