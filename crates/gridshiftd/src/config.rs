//! Daemon configuration.
//!
//! Every option has a documented default and an environment override.
//! Validation failures are fatal at startup: the process never starts
//! serving with a broken configuration.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

/// Required configuration missing or inconsistent at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("provider auth token is required (set GRIDSHIFT_PROVIDER_TOKEN)")]
    MissingToken,

    #[error("zone list must not be empty")]
    EmptyZones,

    #[error("active zone {zone} is not in the configured zone list")]
    UnknownActiveZone { zone: String },

    #[error("max intensity must be a finite positive number, got {0}")]
    BadMaxIntensity(f64),
}

#[derive(Debug, Parser)]
#[command(name = "gridshiftd", about = "Carbon-aware deployment controller daemon")]
pub struct Config {
    /// Auth token for the carbon-intensity provider.
    #[arg(long, env = "GRIDSHIFT_PROVIDER_TOKEN")]
    pub provider_token: Option<String>,

    /// Carbon-intensity provider base URL.
    #[arg(
        long,
        env = "GRIDSHIFT_PROVIDER_URL",
        default_value = "https://api.electricitymaps.com/v3"
    )]
    pub provider_url: String,

    /// Tracked zones, comma-separated.
    #[arg(
        long,
        env = "GRIDSHIFT_ZONES",
        value_delimiter = ',',
        default_value = "AT,TR,SK,US-CENT-SWPP"
    )]
    pub zones: Vec<String>,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "GRIDSHIFT_REQUEST_TIMEOUT_SECONDS", default_value = "10")]
    pub request_timeout: u64,

    /// Seconds between refresh passes over all zones.
    #[arg(long, env = "GRIDSHIFT_FETCH_INTERVAL_SECONDS", default_value = "3600")]
    pub refresh_interval: u64,

    /// Port for the control-surface API.
    #[arg(long, env = "GRIDSHIFT_PORT", default_value = "9091")]
    pub port: u16,

    /// Initial active deployment zone (overridden by persisted state).
    #[arg(long, env = "GRIDSHIFT_ACTIVE_ZONE", default_value = "AT")]
    pub active_zone: String,

    /// Intensity ceiling (gCO2eq/kWh) that triggers region selection.
    #[arg(long, env = "GRIDSHIFT_MAX_INTENSITY", default_value = "200")]
    pub max_intensity: f64,

    /// Minimum seconds between two selector invocations.
    #[arg(long, env = "GRIDSHIFT_COOLDOWN_SECONDS", default_value = "0")]
    pub cooldown: u64,

    /// Time-series backend base URL for the selector.
    #[arg(long, env = "GRIDSHIFT_PROM_URL", default_value = "http://127.0.0.1:9090")]
    pub prom_url: String,

    /// Metric holding per-zone carbon intensity.
    #[arg(
        long,
        env = "GRIDSHIFT_METRIC",
        default_value = "carbon_intensity_gCo2perkWh"
    )]
    pub metric: String,

    /// JSON file mapping zones to cloud regions (built-in table if unset).
    #[arg(long, env = "GRIDSHIFT_REGION_MAP")]
    pub region_map: Option<PathBuf>,

    /// Path to the gridshift-select binary.
    #[arg(long, env = "GRIDSHIFT_SELECTOR_BIN", default_value = "gridshift-select")]
    pub selector_bin: PathBuf,

    /// Data directory for persisted state.
    #[arg(long, env = "GRIDSHIFT_DATA_DIR", default_value = "/var/lib/gridshift")]
    pub data_dir: PathBuf,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.provider_token.as_deref() {
            None | Some("") => return Err(ConfigError::MissingToken),
            Some(_) => {}
        }
        if self.zones.is_empty() {
            return Err(ConfigError::EmptyZones);
        }
        if !self.zones.contains(&self.active_zone) {
            return Err(ConfigError::UnknownActiveZone {
                zone: self.active_zone.clone(),
            });
        }
        if !self.max_intensity.is_finite() || self.max_intensity <= 0.0 {
            return Err(ConfigError::BadMaxIntensity(self.max_intensity));
        }
        Ok(())
    }

    /// Where the active zone is persisted.
    pub fn active_zone_path(&self) -> PathBuf {
        self.data_dir.join("current_zone.txt")
    }
}
