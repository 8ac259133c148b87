//! CLI module
//!
//! Subcommands:
//! - `serve`: REST and gRPC listeners together (default deployment)
//! - `rest`: REST listener only
//! - `grpc`: gRPC listener only

pub mod grpc;
pub mod rest;
pub mod serve;

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};

use crate::api::AppState;
use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Model lifecycle service - train, retrain, predict and delete named classifiers
#[derive(Parser)]
#[command(name = "model-lifecycle-service")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file layered over config/default and config/local
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the REST and gRPC servers together
    Serve,

    /// Run the REST server only
    Rest,

    /// Run the gRPC server only
    Grpc,
}

/// Load configuration, install logging and build the shared state
pub(crate) async fn bootstrap(config_path: Option<&Path>) -> anyhow::Result<(AppConfig, AppState)> {
    let config = AppConfig::load(config_path).context("Failed to load configuration")?;
    logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    let state = crate::create_app_state_with_config(&config).await?;
    Ok((config, state))
}

pub(crate) fn socket_addr(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Invalid listen host '{}'", host))?;
    Ok(SocketAddr::from((ip, port)))
}

pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["model-lifecycle-service", "grpc", "--config", "prod.toml"]);
        assert!(matches!(cli.command, Command::Grpc));
        assert_eq!(cli.config, Some(PathBuf::from("prod.toml")));
    }

    #[test]
    fn test_socket_addr() {
        assert_eq!(socket_addr("127.0.0.1", 8000).unwrap().port(), 8000);
        assert!(socket_addr("not-a-host", 8000).is_err());
    }
}
