//! station-sim: runs the car wash on top of the service-station core.

mod cli;
mod coordinator;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, LogFormat};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_FILTER: &str = "station_sim=info,service_station=info";

fn init_tracing(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("failed to build log filter")?;

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .try_init(),
    }
    .context("failed to install tracing subscriber")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format)?;
    let config = args.station_config()?;

    info!("station-sim v{} starting", VERSION);
    if config.is_continuous() {
        info!("cars arrive until Ctrl+C");
    }

    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };
    let summary = coordinator::run(config, interrupt).await?;

    info!(
        produced = summary.produced,
        serviced = summary.serviced,
        abandoned = summary.abandoned,
        turned_away = summary.turned_away,
        completions = summary.completions,
        left_in_queue = summary.left_in_queue,
        invariant_violations = summary.invariant_violations,
        drained = summary.drained,
        interrupted = summary.interrupted,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "run complete"
    );
    if !summary.drained && !summary.interrupted {
        warn!("station did not drain cleanly");
    }
    Ok(())
}
