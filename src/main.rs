mod config;
mod constants;
mod core_auth;
mod core_cli;
mod core_ftpcommand;
mod core_log;
mod core_network;
mod helpers;
mod server;
mod session;

use crate::config::Config;
use crate::core_cli::Cli;
use crate::core_log::logger::init_logger;
use crate::server::Server;
use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Cli::parse();

    init_logger(args.verbose);

    // Load configuration from the TOML file, or run on defaults
    let mut config = match args.config.as_deref() {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => Config::default(),
    };

    // CLI values override the file
    if let Some(port) = args.port {
        config.server.listen_port = port;
    }
    if let Some(root) = args.root {
        config.server.root_dir = root;
    }
    config.validate().context("Invalid configuration")?;

    info!("  Listen Port: {}", config.server.listen_port);
    info!("  PASV Address: {}", config.server.pasv_address);
    info!("  Root Directory: {}", config.server.root_dir);
    info!("  Data Timeout: {}s", config.server.data_timeout_secs);

    let server = Server::bind(&config).await?;

    tokio::select! {
        _ = server.run() => {}
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        },
    }

    server.shutdown().await;
    info!("Server stopped");
    Ok(())
}
