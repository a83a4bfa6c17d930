//! removeip server
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                      removeip                        │
//!                     │                                                      │
//!  Client Request     │  ┌──────────┐   ┌────────────┐   ┌───────────────┐   │
//!  ───────────────────┼─▶│   net    │──▶│   http     │──▶│   pipeline    │   │
//!                     │  │ listener │   │  server    │   │ post-read     │   │
//!                     │  │(session) │   │ (hyper h1) │   │ pre-access    │   │
//!                     │  └──────────┘   └────────────┘   │ access        │   │
//!                     │                                  │ content(echo) │   │
//!                     │                                  │ log           │   │
//!                     │                                  └───────┬───────┘   │
//!                     │                                          │           │
//!                     │      ┌───────────────────────────────────┘           │
//!                     │      ▼                                               │
//!                     │  ┌──────────────────────┐  ┌──────────────────────┐  │
//!                     │  │ masking              │  │ routing              │  │
//!                     │  │ stage / snapshot /   │  │ scope tree, merged   │  │
//!                     │  │ placeholder / guard  │  │ removeip policy      │  │
//!                     │  └──────────────────────┘  └──────────────────────┘  │
//!                     │                                                      │
//!                     │  config · observability · security · lifecycle       │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;

use removeip::config::watcher::ConfigWatcher;
use removeip::config::{load_config, RemoveIpConfig};
use removeip::lifecycle::{finalize, signals, Shutdown};
use removeip::net::Listener;
use removeip::observability::{logging, metrics};
use removeip::HttpServer;

#[derive(Parser)]
#[command(name = "removeip")]
#[command(about = "HTTP server that hides client addresses from request logic", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RemoveIpConfig::default(),
    };

    logging::init(&config.observability.log_level);

    if cli.check {
        finalize(config)?;
        tracing::info!("Configuration is valid");
        return Ok(());
    }

    tracing::info!("removeip v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let server = HttpServer::new(config)?;
    let listener = Listener::bind(&server.config().listener).await?;

    // Hold the watcher for the lifetime of the server.
    let (_watcher, config_updates) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
