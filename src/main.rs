use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fire_engine::config::{ServeArgs, ServiceConfig};

#[derive(Parser, Debug)]
#[command(
    name = "fire-engine",
    about = "Projects portfolio growth towards a FIRE target from historical prices"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API.
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Serve(args) => {
            let config = match ServiceConfig::from_args(&args) {
                Ok(config) => config,
                Err(e) => {
                    error!("startup failed: {e}");
                    std::process::exit(1);
                }
            };
            info!(
                "service version {} ready = {}",
                config.version, config.ticker_map_loaded
            );
            if let Err(e) = fire_engine::api::run_http_server(args.port, config).await {
                error!("server error: {e}");
                std::process::exit(1);
            }
        }
    }
}
