//! beacon-sim: run a room of in-process peers over one channel bus.
//!
//! Every peer uses loopback connections and capture devices, so a full
//! call (presence, offer/answer, ICE, screen share, alerts) can be watched
//! in the logs without a browser or network.

mod scenario;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "beacon-sim", about = "Simulate a beacon room with in-process peers")]
struct Args {
    /// Config file to use instead of the platform default.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Room to open on every peer.
    #[arg(short, long, default_value = "family")]
    room: String,

    /// Remote peers besides the configured identity, in join order.
    #[arg(short, long, value_delimiter = ',', default_value = "amy,zed")]
    peers: Vec<String>,

    /// Deny camera access to this peer.
    #[arg(long)]
    deny_camera: Option<String>,

    /// Have this peer share its screen once everyone is in.
    #[arg(long)]
    screen_share: Option<String>,

    /// Start the call with a call-mode alert from the local peer.
    #[arg(long)]
    alert: bool,

    /// Print the effective config as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let loaded = match &args.config {
        Some(path) => beacon_config::load_config_from(path),
        None => beacon_config::load_config(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("beacon-sim: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.print_config {
        println!("{}", beacon_config::config_to_json(&config));
        return ExitCode::SUCCESS;
    }

    let level = config.logging.level.as_filter();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("beacon_sim={level},beacon_social={level}").into()),
        )
        .init();

    let scenario = Scenario {
        room: args.room,
        peers: args.peers,
        deny_camera: args.deny_camera,
        screen_share: args.screen_share,
        alert: args.alert,
    };

    match scenario::run(&config, &scenario).await {
        Ok(report) => {
            report.log();
            if report.clean_shutdown {
                ExitCode::SUCCESS
            } else {
                tracing::warn!("Some peers did not shut down cleanly");
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Simulation failed");
            ExitCode::FAILURE
        }
    }
}
