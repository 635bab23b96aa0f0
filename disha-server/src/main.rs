//! DishaServer - radio map distribution daemon
//!
//! Binds a TCP listener, serves `radiomap-mean` and `parameters` files
//! to positioning clients and stores uploaded RSS logs. Stops cleanly
//! on Ctrl-C.

use disha_server::error::Result;
use disha_server::{AppConfig, ConnectionRegistry, ConnectionServer};
use std::env;
use std::sync::Arc;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `disha-server <path>` (positional)
/// - `disha-server --config <path>` (flag-based)
/// - `disha-server -c <path>` (short flag)
///
/// Defaults to `/etc/disha-server.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    "/etc/disha-server.toml".to_string()
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let config = AppConfig::from_file(&config_path)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.logging.level),
    )
    .init();

    log::info!("DishaServer starting, config: {config_path}");
    log::info!(
        "survey mode: {}, serving {} + {}",
        config.server.axis_mode()?,
        config.server.radiomap_mean.display(),
        config.server.parameters.display()
    );
    if !config.server.radiomap_mean.is_file() {
        log::warn!(
            "radio map file {} is missing; clients will get BUSY",
            config.server.radiomap_mean.display()
        );
    }
    if !config.server.parameters.is_file() {
        log::warn!(
            "parameters file {} is missing; clients will get BUSY",
            config.server.parameters.display()
        );
    }
    if !config.server.upload_dir.is_dir() {
        log::warn!(
            "upload folder {} is missing; uploads will get BUSY",
            config.server.upload_dir.display()
        );
    }

    let registry = Arc::new(ConnectionRegistry::new());
    let server = ConnectionServer::bind(&config.server, Arc::clone(&registry))?;

    let shutdown = server.shutdown_handle()?;
    ctrlc::set_handler(move || {
        log::info!("received shutdown signal");
        shutdown.stop();
    })
    .map_err(|e| disha_server::Error::Other(format!("cannot install Ctrl-C handler: {e}")))?;

    server.run()?;

    let served = registry.len();
    log::info!("DishaServer stopped after {served} connections");
    Ok(())
}
