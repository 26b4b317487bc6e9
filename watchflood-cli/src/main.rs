//! Watchflood CLI - Synthetic watch-party load generator
//!
//! Takes the target population on the command line and everything else
//! from `WATCHFLOOD_*` environment variables. Runs until interrupted.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Parser;
use watchflood_core::tracing_setup::init_tracing;
use watchflood_core::{HttpApiClient, WatchfloodConfig};
use watchflood_sim::{SimContext, Simulator};

#[derive(Parser)]
#[command(name = "watchflood")]
#[command(about = "Synthetic watch-party load generator")]
struct Cli {
    /// Number of instances the population churns around
    #[arg(value_parser = parse_positive)]
    target_instance_count: usize,

    /// Number of agents each instance churns around
    #[arg(value_parser = parse_positive)]
    target_agents_per_instance: usize,
}

fn parse_positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Configured seed, or wall-clock seconds when none is set.
fn resolve_seed(configured: Option<u64>) -> u64 {
    configured.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = WatchfloodConfig::from_env();

    init_tracing(tracing::Level::INFO, config.logs_dir.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let seed = resolve_seed(config.simulation.seed);
    tracing::info!("Run seed: {} (set WATCHFLOOD_SEED={} to replay)", seed, seed);

    let api = HttpApiClient::new(&config.api).context("Failed to build API client")?;
    tracing::info!(
        "Targeting {} with protocol {}",
        api.base_url(),
        config.api.protocol
    );

    let ctx = SimContext::new(Arc::new(api), config.simulation, seed);
    let mut simulator = Simulator::new(
        ctx,
        cli.target_instance_count,
        cli.target_agents_per_instance,
    );

    tokio::select! {
        _ = simulator.run() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Interrupted, stopping simulation");
        }
    }

    let report = simulator.report();
    tracing::info!("{}", report.summary());
    println!("{}", report.summary());

    Ok(())
}
