//! The fetcher — override-aware intensity acquisition.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use gridshift_state::{IntensitySource, ZoneStore};

use crate::error::FetchError;
use crate::provider::IntensityProvider;

/// Obtains a zone's current intensity and records it in the store.
///
/// The provider-result write is conditional: it re-checks the override
/// table under the store's write lock, so an override installed while
/// a provider fetch is in flight keeps its Override-stamped record
/// even when the slow fetch lands afterwards.
#[derive(Clone)]
pub struct Fetcher {
    store: ZoneStore,
    provider: Arc<dyn IntensityProvider>,
}

impl Fetcher {
    pub fn new(store: ZoneStore, provider: Arc<dyn IntensityProvider>) -> Self {
        Self { store, provider }
    }

    /// Current intensity for `zone`.
    ///
    /// An active override is returned immediately — no network call —
    /// and stamped into the store with source `Override`. Otherwise the
    /// provider is queried; on success the store is updated with source
    /// `Provider`, on failure the store is left untouched. An override
    /// installed while the provider call was in flight wins: the late
    /// result is discarded and the override value returned.
    pub async fn fetch(&self, zone: &str) -> Result<f64, FetchError> {
        if let Some(value) = self.store.override_for(zone) {
            self.store
                .set(zone, value, IntensitySource::Override, epoch_secs());
            debug!(zone, value, "serving manual override");
            return Ok(value);
        }

        let value = self.provider.latest(zone).await?;
        if !self.store.set_unless_overridden(zone, value, epoch_secs()) {
            if let Some(value) = self.store.override_for(zone) {
                debug!(zone, value, "override installed mid-fetch; serving it");
                return Ok(value);
            }
        }
        Ok(value)
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
