//! gridshiftd — the carbon-aware deployment controller daemon.
//!
//! Single binary that assembles all gridshift subsystems:
//! - Zone state store (in-memory) + persisted active zone
//! - Intensity fetcher (provider HTTP client)
//! - Trigger controller (cooldown-gated region selection)
//! - Periodic refresh loop + override retrigger worker
//! - Control-surface REST API
//!
//! # Usage
//!
//! ```text
//! GRIDSHIFT_PROVIDER_TOKEN=... gridshiftd --zones AT,TR,SK --port 9091
//! ```

mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use gridshift_api::ApiState;
use gridshift_fetch::{Fetcher, ProviderClient};
use gridshift_trigger::{
    RefreshLoop, Retrigger, SelectSubprocess, TriggerConfig, TriggerController,
};

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gridshift=debug".parse().unwrap()),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    info!("gridshift daemon starting");

    std::fs::create_dir_all(&config.data_dir)?;
    let active_zone_path = config.active_zone_path();

    // Seed the active zone from persisted state, falling back to the
    // configured default when the persisted zone is no longer tracked.
    let active_zone = match gridshift_state::read_active_zone(&active_zone_path) {
        Some(zone) if config.zones.contains(&zone) => zone,
        Some(zone) => {
            warn!(
                persisted = %zone,
                fallback = %config.active_zone,
                "persisted active zone is not in the configured zone list"
            );
            config.active_zone.clone()
        }
        None => config.active_zone.clone(),
    };
    info!(%active_zone, zones = config.zones.len(), "zone tracking initialized");

    // ── Initialize subsystems ──────────────────────────────────

    let store = gridshift_state::ZoneStore::new(&config.zones);

    let token = config.provider_token.as_deref().unwrap_or_default();
    let provider = ProviderClient::new(
        &config.provider_url,
        token,
        Duration::from_secs(config.request_timeout),
    )?;
    let fetcher = Fetcher::new(store.clone(), Arc::new(provider));
    info!(provider_url = %config.provider_url, "intensity fetcher initialized");

    let invoker = SelectSubprocess {
        binary: config.selector_bin.clone(),
        backend_url: config.prom_url.clone(),
        metric: config.metric.clone(),
        zones: config.zones.clone(),
        query_timeout_secs: config.request_timeout,
        max_ceiling: Some(config.max_intensity),
        region_map: config.region_map.clone(),
    };
    let trigger = Arc::new(TriggerController::new(
        TriggerConfig {
            max_intensity: config.max_intensity,
            cooldown: Duration::from_secs(config.cooldown),
            active_zone_path,
        },
        Arc::new(invoker),
        active_zone,
    ));
    info!(
        max_intensity = config.max_intensity,
        cooldown_secs = config.cooldown,
        "trigger controller initialized"
    );

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let refresh = RefreshLoop::new(
        config.zones.clone(),
        Duration::from_secs(config.refresh_interval),
        fetcher.clone(),
        trigger.clone(),
    );
    let refresh_handle = tokio::spawn(refresh.run(shutdown_rx.clone()));

    let (retrigger, retrigger_handle) =
        Retrigger::spawn(fetcher, trigger.clone(), shutdown_rx.clone());

    // ── Start API server ───────────────────────────────────────

    let router = gridshift_api::build_router(ApiState {
        store,
        trigger,
        retrigger,
        zones: Arc::new(config.zones.clone()),
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Wait for background tasks.
    let _ = refresh_handle.await;
    let _ = retrigger_handle.await;

    info!("gridshift daemon stopped");
    Ok(())
}
