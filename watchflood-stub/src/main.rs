//! Watchflood stub server binary

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use watchflood_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "watchflood-stub")]
#[command(about = "Mock video-serving API for local load tests")]
struct Cli {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to bind (0 picks a free port)
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Seed for fixture generation
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Console log level
    #[arg(long, value_enum, default_value_t = CliLogLevel::Info)]
    log_level: CliLogLevel,

    /// Directory for the trace log file
    #[arg(long)]
    logs_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_tracing_level(), cli.logs_dir.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let addr = SocketAddr::new(cli.host, cli.port);
    let (local_addr, handle) = watchflood_stub::spawn(addr, cli.seed)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    println!("Watchflood stub running on http://{local_addr} (seed {})", cli.seed);

    tokio::select! {
        result = handle => {
            result.context("Stub server task panicked")??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down stub server");
        }
    }

    Ok(())
}
