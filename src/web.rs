#![cfg(not(tarpaulin_include))]

use clap::Parser;
use pizza_ranking::app;
use pizza_ranking::config::{Cli, Config};

/// Main entry point for the rating server
///
/// Initializes logging (`RUST_LOG`, `info` by default), resolves the
/// configuration from flags and environment, and serves the API until
/// Ctrl+C or SIGTERM.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_cli_and_env(Cli::parse());
    app::run(config).await
}
