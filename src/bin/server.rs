//! TransBack HTTP API server

#![forbid(unsafe_code)]

use dotenvy::dotenv;

use transback::core::config::{AppConfig, API_KEY_VAR};
use transback::logging::init_logging;
use transback::server::api::run_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = AppConfig::from_env()?;
    if let Err(e) = config.require_api_key() {
        eprintln!("ERROR: {}", e);
        eprintln!("Please set {} before running the API server.", API_KEY_VAR);
        std::process::exit(1);
    }

    init_logging(config.debug);

    let host = config.host.clone();
    let port = config.port;
    println!("{}", "=".repeat(60));
    println!("TransBack API Server");
    println!("{}", "=".repeat(60));
    println!("🚀 Server starting on http://{}:{}", host, port);
    println!("   API endpoint: POST http://{}:{}/translate", host, port);
    println!("   Streaming:    POST http://{}:{}/translate/stream", host, port);
    println!("   Web UI:       http://{}:{}/", host, port);
    println!("{}", "=".repeat(60));

    run_server(config).await
}
