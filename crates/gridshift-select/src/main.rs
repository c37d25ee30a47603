//! gridshift-select — standalone greenest-zone chooser.
//!
//! Invoked by the trigger controller as an isolated subprocess (and
//! usable by hand). Logging goes to stderr so that stdout carries only
//! the JSON report in `--format json` mode.
//!
//! Exit status: 0 iff a zone was picked, 1 otherwise.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use gridshift_select::{select, PromClient, RegionMap, SelectParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "gridshift-select",
    about = "Pick the greenest deployment zone from a time-series backend"
)]
struct Cli {
    /// Time-series backend base URL.
    #[arg(long, env = "GRIDSHIFT_PROM_URL", default_value = "http://127.0.0.1:9090")]
    backend_url: String,

    /// Candidate zones, comma-separated.
    #[arg(
        long,
        env = "GRIDSHIFT_ZONES",
        value_delimiter = ',',
        default_value = "AT,TR,SK,US-CENT-SWPP"
    )]
    zones: Vec<String>,

    /// Metric holding per-zone carbon intensity.
    #[arg(
        long,
        env = "GRIDSHIFT_METRIC",
        default_value = "carbon_intensity_gCo2perkWh"
    )]
    metric: String,

    /// Per-query HTTP timeout in seconds.
    #[arg(long, env = "GRIDSHIFT_REQUEST_TIMEOUT_SECONDS", default_value = "5")]
    timeout: u64,

    /// Maximum acceptable intensity (gCO2eq/kWh); the pick is rejected
    /// when even the minimum exceeds this.
    #[arg(long, env = "GRIDSHIFT_MAX_INTENSITY")]
    max_ceiling: Option<f64>,

    /// JSON file mapping zones to cloud regions (built-in table if unset).
    #[arg(long, env = "GRIDSHIFT_REGION_MAP")]
    region_map: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let regions = RegionMap::load(cli.region_map.as_deref())?;
    let client = PromClient::new(&cli.backend_url, Duration::from_secs(cli.timeout))?;
    let params = SelectParams {
        metric: cli.metric,
        zones: cli.zones,
        ceiling: cli.max_ceiling,
    };

    let report = select(&client, &regions, &params).await;
    let picked = report.best.is_some();

    match cli.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => match &report.best {
            Some(best) => {
                println!("zone:   {}", best.zone);
                println!("region: {}", best.region.as_deref().unwrap_or("-"));
                println!("value:  {:.1} gCO2eq/kWh", best.value);
            }
            None => match report.max_ceiling {
                Some(c) => println!("no zone at or under the ceiling ({c} gCO2eq/kWh)"),
                None => println!("no valid intensity data found"),
            },
        },
    }

    std::process::exit(if picked { 0 } else { 1 });
}
