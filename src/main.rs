use clap::Parser;
use log::{error, info};
use pi_fancontrol::config::{self, Config};
use pi_fancontrol::hardware::{Level, SimBoard};
use pi_fancontrol::node::{Hardware, Node};
use pi_fancontrol::server;
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;

const DEFAULT_ENV_FILE: &str = ".env";

#[derive(Parser)]
#[command(name = "fancontrol")]
#[command(about = "CPU temperature driven fan controller")]
struct Cli {
    /// File with KEY=value defaults; real environment variables win.
    /// Defaults to ./.env when that file exists
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Drive simulated lines instead of sysfs GPIO/PWM
    #[arg(long)]
    dry_run: bool,

    /// Override STATUS_PORT
    #[arg(long)]
    status_port: Option<u16>,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logger();
    info!("Starting fan controller");

    let env_file = cli
        .env_file
        .or_else(|| Some(PathBuf::from(DEFAULT_ENV_FILE)).filter(|path| path.exists()));
    let loaded = match &env_file {
        Some(path) => {
            info!("Reading defaults from {}", path.display());
            Config::from_env_with(&config::load_dotenv(path))
        }
        None => Config::from_env(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    if let Some(port) = cli.status_port {
        config.status.port = port;
    }

    info!("Configuration loaded:");
    info!(
        "  Band: {}C..{}C -> {}..{}",
        config.control.temp_low,
        config.control.temp_high,
        config.control.fan_min,
        config.control.fan_max
    );
    info!("  Tick interval: {:?}", config.control.tick_interval);
    info!("  Actuator: {}", config.actuator.name());
    match &config.peer {
        Some(peer) => info!("  Peer: {} (timeout {:?})", peer.temp_url(), peer.timeout),
        None => info!("  Peer: disabled"),
    }

    let hardware = if cli.dry_run {
        info!("  Dry run: actuator writes go to simulated lines");
        Hardware::Simulated {
            board: SimBoard::new(),
            presence: Level::High,
        }
    } else {
        Hardware::Sysfs
    };

    let node = match Node::build(&config, &hardware) {
        Ok(node) => node,
        Err(e) => {
            error!("Failed to start: {}", e);
            std::process::exit(2);
        }
    };

    let listener = match server::bind(config.status.socket_addr()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(
                "Failed to bind status service on {}: {}",
                config.status.socket_addr(),
                e
            );
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        ctrl_c.cancel();
    });

    if let Err(e) = node.run(listener, shutdown).await {
        error!("Fan controller stopped on fault: {}", e);
        std::process::exit(1);
    }

    info!("Fan controller stopped");
}
