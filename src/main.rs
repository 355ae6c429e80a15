//! Main entry point for the TransBack file translator

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use tracing::{error, info};

use transback::cli::commands::{handle_translate, Args};
use transback::core::config::{AppConfig, API_KEY_VAR};
use transback::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Args::parse();
    init_logging(args.debug);

    info!("TransBack Translation Tool - Starting");

    let config = AppConfig::from_env()?;
    if let Err(e) = config.require_api_key() {
        error!("{}", e);
        eprintln!("Set {} env var.", API_KEY_VAR);
        std::process::exit(1);
    }

    handle_translate(args, config).await
}
