//! Probe a paired node the way the control loop does.
//!
//! Usage:
//!   cargo run --bin peer-probe -- pi-b.local
//!   cargo run --bin peer-probe -- pi-b.local --port 9768 --count 5
//!
//! Performs one peer fetch per interval and prints the reading, or why the
//! peer counts as unreachable for that tick.

use clap::Parser;
use log::{info, warn};
use pi_fancontrol::config::{DEFAULT_STATUS_PORT, PeerConfig};
use pi_fancontrol::peer::{PeerClient, PeerSource};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "peer-probe")]
#[command(about = "Fetch a peer node's temperature as the control loop would")]
struct Cli {
    /// Peer hostname or address
    #[arg(env = "PEER_HOSTNAME")]
    hostname: String,

    /// Peer status port
    #[arg(long, env = "PEER_PORT", default_value_t = DEFAULT_STATUS_PORT)]
    port: u16,

    /// Per-fetch timeout in milliseconds
    #[arg(long, env = "PEER_TIMEOUT_MS", default_value_t = 3000)]
    timeout_ms: u64,

    /// Number of fetches
    #[arg(long, default_value_t = 1)]
    count: u32,

    /// Seconds between fetches
    #[arg(long, default_value_t = 1)]
    interval_secs: u64,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = PeerConfig {
        hostname: cli.hostname,
        port: cli.port,
        timeout: Duration::from_millis(cli.timeout_ms),
    };

    let peer = match PeerClient::new(&config) {
        Ok(peer) => peer,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };

    let mut reachable = 0;
    for attempt in 1..=cli.count {
        match peer.fetch_temperature().await {
            Ok(temp) => {
                reachable += 1;
                info!("[{}] {} -> {}", attempt, peer.endpoint(), temp);
            }
            Err(e) => warn!("[{}] {} unreachable: {}", attempt, peer.endpoint(), e),
        }
        if attempt < cli.count {
            tokio::time::sleep(Duration::from_secs(cli.interval_secs)).await;
        }
    }

    info!("{}/{} fetches reachable", reachable, cli.count);
    if reachable == 0 {
        std::process::exit(1);
    }
}
