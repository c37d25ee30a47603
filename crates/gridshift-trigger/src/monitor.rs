//! Periodic refresh loop.
//!
//! On a fixed interval, refreshes every configured zone through the
//! fetcher and hands the active zone's fresh value to the trigger
//! controller. Zones are independent: one failed fetch is logged and
//! the loop proceeds to the next.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use gridshift_fetch::Fetcher;

use crate::controller::TriggerController;

pub struct RefreshLoop {
    zones: Vec<String>,
    interval: Duration,
    fetcher: Fetcher,
    trigger: Arc<TriggerController>,
}

impl RefreshLoop {
    pub fn new(
        zones: Vec<String>,
        interval: Duration,
        fetcher: Fetcher,
        trigger: Arc<TriggerController>,
    ) -> Self {
        Self {
            zones,
            interval,
            fetcher,
            trigger,
        }
    }

    /// Refresh every zone once and evaluate the active one.
    pub async fn refresh_all(&self) {
        for zone in &self.zones {
            match self.fetcher.fetch(zone).await {
                Ok(value) => {
                    debug!(%zone, value, "zone refreshed");
                    // Re-read per zone: a migration can move the active
                    // pointer while this pass is still running.
                    if *zone == self.trigger.active_zone().await {
                        self.trigger.evaluate(zone, value).await;
                    }
                }
                Err(e) => {
                    warn!(%zone, error = %e, "intensity fetch failed; keeping last known value");
                }
            }
        }
    }

    /// Run until the shutdown signal flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            zones = self.zones.len(),
            "refresh loop started"
        );

        loop {
            self.refresh_all().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    info!("refresh loop shutting down");
                    break;
                }
            }
        }
    }
}
