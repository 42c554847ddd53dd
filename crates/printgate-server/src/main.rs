use anyhow::Context;
use clap::Parser;
use printgate_core::constants::DEFAULT_STATUS_FILE;
use printgate_serial::{DeviceManager, LinkConfig};
use printgate_server::{ServerConfig, available_ports, resolve_port};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Serve a fingerprint access controller over HTTP.
///
/// The controller is reached over a serial port. Without --port, the first
/// port reported by the OS is used, then the platform default.
#[derive(Debug, Parser)]
#[command(name = "printgate", version = printgate_core::VERSION, about)]
struct Args {
    /// Serial port of the controller
    #[arg(long, short, env = "PRINTGATE_PORT")]
    port: Option<String>,

    /// Serial baud rate
    #[arg(long, short, env = "PRINTGATE_BAUD", default_value_t = printgate_core::constants::DEFAULT_BAUD_RATE)]
    baud_rate: u32,

    /// HTTP bind address
    #[arg(long, env = "PRINTGATE_BIND", default_value = printgate_server::config::DEFAULT_BIND_ADDR)]
    bind: SocketAddr,

    /// Mirror every status update to this file
    #[arg(long, env = "PRINTGATE_STATUS_FILE", default_value = DEFAULT_STATUS_FILE)]
    status_file: PathBuf,

    /// Do not mirror status updates to a file
    #[arg(long)]
    no_status_file: bool,

    /// List the available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind,
            port: self.port,
            link: LinkConfig {
                baud_rate: self.baud_rate,
                status_file: (!self.no_status_file).then_some(self.status_file),
                ..LinkConfig::default()
            },
        }
    }
}

fn list_ports() {
    let ports = available_ports();
    if ports.is_empty() {
        println!("No serial ports found.");
        return;
    }

    println!("Available serial ports:");
    for (i, port) in ports.iter().enumerate() {
        println!("  {}: {}", i + 1, port);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if args.list_ports {
        list_ports();
        return Ok(());
    }

    info!(version = printgate_core::VERSION, "Starting PrintGate");
    let config = args.into_config();
    if let Some(path) = &config.link.status_file {
        info!(path = %path.display(), "Mirroring status to file");
    }
    let port = resolve_port(config.port.as_deref());

    let manager = Arc::new(DeviceManager::new(config.link.clone()));
    if manager.initialize(&port).is_err() {
        warn!("Starting without a device link; commands will fail until restart");
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {}", config.bind_addr))?;

    let served = printgate_server::serve(listener, Arc::clone(&manager), shutdown_signal()).await;

    manager.shutdown().await;
    served.context("HTTP server error")?;

    info!("Bye");
    Ok(())
}
