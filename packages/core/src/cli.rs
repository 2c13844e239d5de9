use std::net::SocketAddr;

use clap::Parser;

/// Integration monitor CLI arguments
#[derive(Debug, Default, Parser)]
#[command(
    name = "integration-monitor",
    version,
    about = "Health monitoring and retry simulation for third-party integrations"
)]
pub struct Cli {
    /// Address the HTTP API listens on
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Seed for the simulated health probe (reproducible outcomes)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Run a bulk check every N seconds (0 disables)
    #[arg(long)]
    pub auto_check_interval: Option<u64>,
}
