//! In-memory zone state store with manual-override support.
//!
//! One `ZoneRecord` per known zone plus an override table. Overrides are
//! the operator's escape hatch: while an entry exists for a zone, the
//! fetcher serves that value instead of calling the provider.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::types::{IntensitySource, ZoneRecord};

struct Inner {
    records: BTreeMap<String, ZoneRecord>,
    overrides: BTreeMap<String, f64>,
}

/// Cheaply cloneable handle to the shared zone state.
///
/// All operations take the internal lock for the duration of a single
/// read-modify-write; no lock is ever held across an await point.
#[derive(Clone)]
pub struct ZoneStore {
    inner: Arc<RwLock<Inner>>,
}

impl ZoneStore {
    /// Create a store seeded with a zero-value `Initial` record for each
    /// configured zone.
    pub fn new(zones: &[String]) -> Self {
        let records = zones
            .iter()
            .map(|z| (z.clone(), ZoneRecord::default()))
            .collect();
        Self {
            inner: Arc::new(RwLock::new(Inner {
                records,
                overrides: BTreeMap::new(),
            })),
        }
    }

    /// Latest record for a zone. Unknown zones read as the zero-value
    /// `Initial` record.
    pub fn get(&self, zone: &str) -> ZoneRecord {
        let inner = self.inner.read().unwrap();
        inner.records.get(zone).copied().unwrap_or_default()
    }

    /// Replace a zone's record. Records are never deleted, only replaced.
    pub fn set(&self, zone: &str, value: f64, source: IntensitySource, now: u64) {
        let mut inner = self.inner.write().unwrap();
        inner.records.insert(
            zone.to_string(),
            ZoneRecord {
                value,
                source,
                observed_at: now,
            },
        );
    }

    /// Record a provider observation unless an override holds the zone.
    ///
    /// The override check and the write happen under one write-lock
    /// acquisition, so an override installed while a provider fetch was
    /// in flight cannot have its record clobbered by the fetch landing
    /// late. Returns `false` when the write was skipped.
    pub fn set_unless_overridden(&self, zone: &str, value: f64, now: u64) -> bool {
        let mut inner = self.inner.write().unwrap();
        if inner.overrides.contains_key(zone) {
            debug!(zone, value, "discarding provider value for overridden zone");
            return false;
        }
        inner.records.insert(
            zone.to_string(),
            ZoneRecord {
                value,
                source: IntensitySource::Provider,
                observed_at: now,
            },
        );
        true
    }

    /// Consistent point-in-time copy of all zone records.
    pub fn snapshot(&self) -> BTreeMap<String, ZoneRecord> {
        let inner = self.inner.read().unwrap();
        inner.records.clone()
    }

    /// Install a manual override for a zone.
    pub fn set_override(&self, zone: &str, value: f64) {
        let mut inner = self.inner.write().unwrap();
        inner.overrides.insert(zone.to_string(), value);
        debug!(zone, value, "override set");
    }

    /// Remove a zone's override. Returns `false` (and changes nothing) if
    /// no override was present.
    pub fn clear_override(&self, zone: &str) -> bool {
        let mut inner = self.inner.write().unwrap();
        let existed = inner.overrides.remove(zone).is_some();
        if existed {
            debug!(zone, "override cleared");
        }
        existed
    }

    /// The override value for a zone, if one is installed.
    pub fn override_for(&self, zone: &str) -> Option<f64> {
        let inner = self.inner.read().unwrap();
        inner.overrides.get(zone).copied()
    }

    /// Copy of the full override table.
    pub fn overrides(&self) -> BTreeMap<String, f64> {
        let inner = self.inner.read().unwrap();
        inner.overrides.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn configured_zones_start_as_initial() {
        let store = ZoneStore::new(&zones(&["AT", "DE"]));
        let rec = store.get("AT");
        assert_eq!(rec.value, 0.0);
        assert_eq!(rec.source, IntensitySource::Initial);
        assert_eq!(rec.observed_at, 0);
    }

    #[test]
    fn unknown_zone_reads_as_zero_value_initial() {
        let store = ZoneStore::new(&zones(&["AT"]));
        let rec = store.get("XX");
        assert_eq!(rec, ZoneRecord::default());
    }

    #[test]
    fn set_replaces_record() {
        let store = ZoneStore::new(&zones(&["AT"]));
        store.set("AT", 230.0, IntensitySource::Provider, 1000);
        let rec = store.get("AT");
        assert_eq!(rec.value, 230.0);
        assert_eq!(rec.source, IntensitySource::Provider);
        assert_eq!(rec.observed_at, 1000);

        store.set("AT", 500.0, IntensitySource::Override, 2000);
        assert_eq!(store.get("AT").source, IntensitySource::Override);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let store = ZoneStore::new(&zones(&["AT", "DE"]));
        store.set("AT", 180.0, IntensitySource::Provider, 1000);

        let snap = store.snapshot();
        store.set("AT", 999.0, IntensitySource::Provider, 2000);

        assert_eq!(snap["AT"].value, 180.0);
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn override_roundtrip() {
        let store = ZoneStore::new(&zones(&["AT"]));
        assert_eq!(store.override_for("AT"), None);

        store.set_override("AT", 500.0);
        assert_eq!(store.override_for("AT"), Some(500.0));
        assert_eq!(store.overrides().len(), 1);

        assert!(store.clear_override("AT"));
        assert_eq!(store.override_for("AT"), None);
    }

    #[test]
    fn conditional_set_skips_overridden_zone() {
        let store = ZoneStore::new(&zones(&["AT"]));
        store.set_override("AT", 500.0);
        store.set("AT", 500.0, IntensitySource::Override, 1000);

        assert!(!store.set_unless_overridden("AT", 120.0, 2000));
        let rec = store.get("AT");
        assert_eq!(rec.value, 500.0);
        assert_eq!(rec.source, IntensitySource::Override);
        assert_eq!(rec.observed_at, 1000);
    }

    #[test]
    fn conditional_set_writes_when_no_override_holds() {
        let store = ZoneStore::new(&zones(&["AT"]));
        assert!(store.set_unless_overridden("AT", 120.0, 2000));
        let rec = store.get("AT");
        assert_eq!(rec.value, 120.0);
        assert_eq!(rec.source, IntensitySource::Provider);
    }

    #[test]
    fn clear_missing_override_is_a_noop() {
        let store = ZoneStore::new(&zones(&["AT"]));
        assert!(!store.clear_override("AT"));
        assert!(!store.clear_override("XX"));
        assert!(store.overrides().is_empty());
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let store = ZoneStore::new(&zones(&["AT", "DE"]));
        let mut handles = Vec::new();

        for i in 0..8 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                for j in 0..100 {
                    store.set("AT", (i * 100 + j) as f64, IntensitySource::Provider, j);
                    let rec = store.get("AT");
                    assert_eq!(rec.source, IntensitySource::Provider);
                    let _ = store.snapshot();
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }
    }
}
