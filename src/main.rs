//! Granblue Proxy
//!
//! # Architecture Overview
//!
//! ```text
//!   Game client
//!       │
//!       ▼
//!  ┌──────────────┐  raw bytes   ┌──────────────────┐  game-a*, cdn-connect*  ┌───────────┐
//!  │ tunnel proxy │─────────────▶│    controller    │────────────────────────▶│   cache   │
//!  │   (proxy)    │  CONNECT /   │  (host routing)  │   (while heartbeat OK)  │  service  │
//!  └──────────────┘  replay      └──────────────────┘                         └───────────┘
//!                                   │          │
//!                        web host   │          │ other allowed hosts
//!                                   ▼          ▼
//!                             static web     origin
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use granblue_proxy::config::loader::load_config;
use granblue_proxy::config::validation::validate_config;
use granblue_proxy::http::{ControllerServer, Transports};
use granblue_proxy::lifecycle::{signals, Shutdown};
use granblue_proxy::net::{Listener, TunnelProxy};
use granblue_proxy::observability::{logging, metrics};
use granblue_proxy::ProxyConfig;

#[derive(Parser)]
#[command(name = "granblue-proxy")]
#[command(about = "Granblue Fantasy traffic proxy", long_about = None)]
struct Cli {
    /// TOML configuration file; arguments below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the host-routing controller
    Controller {
        /// Address to listen at
        listen_address: Option<String>,
        /// Address of the web server serving static files
        web_address: Option<String>,
        /// Address of the cache service
        #[arg(long)]
        cache: Option<String>,
        /// Hostname served from the static web server
        #[arg(long)]
        web_host: Option<String>,
    },
    /// Start the tunnel proxy
    Proxy {
        /// Address to listen at
        listen_address: Option<String>,
        /// Address every tunnel is dialed to
        backend_address: Option<String>,
    },
}

/// Which service this process runs.
#[derive(Debug, Clone, Copy)]
enum Mode {
    Controller,
    Tunnel,
}

fn apply_overrides(config: &mut ProxyConfig, command: Commands) -> Mode {
    match command {
        Commands::Controller {
            listen_address,
            web_address,
            cache,
            web_host,
        } => {
            let controller = &mut config.controller;
            if let Some(addr) = listen_address {
                controller.bind_address = addr;
            }
            if web_address.is_some() {
                controller.web_address = web_address;
            }
            if cache.is_some() {
                controller.cache_address = cache;
            }
            if web_host.is_some() {
                controller.web_host = web_host;
            }
            Mode::Controller
        }
        Commands::Proxy {
            listen_address,
            backend_address,
        } => {
            if let Some(addr) = listen_address {
                config.tunnel.bind_address = addr;
            }
            if let Some(addr) = backend_address {
                config.tunnel.backend_address = addr;
            }
            Mode::Tunnel
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    let mode = apply_overrides(&mut config, cli.command);
    validate_config(&config).map_err(|errors| {
        errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    })?;

    logging::init(&config.observability.log_level);
    tracing::info!(mode = ?mode, "granblue-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let server = match mode {
        Mode::Controller => {
            let listener = TcpListener::bind(&config.controller.bind_address).await?;
            let transports = Transports::from_config(&config.controller)?;
            let server = ControllerServer::new(&config.controller, transports);
            let signal = shutdown.subscribe();
            tokio::spawn(async move {
                if let Err(e) = server.run(listener, signal).await {
                    tracing::error!(error = %e, "Controller failed");
                }
            })
        }
        Mode::Tunnel => {
            let listener =
                Listener::bind(&config.tunnel.bind_address, config.tunnel.max_connections).await?;
            let proxy = TunnelProxy::new(&config.tunnel);
            tokio::spawn(proxy.run(listener, shutdown.subscribe()))
        }
    };

    signals::wait_for_signal().await;
    shutdown.trigger();
    server.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
