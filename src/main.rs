//! api-dispatch
//!
//! HTTP service that routes each request to one API paradigm.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (axum fallback, request ID, trace, limits)
//!                          │
//!                          ▼
//!                     http::Request (method, path, query, body, headers)
//!                          │
//!                          ▼
//!                     dispatch::Dispatcher ──── fingerprint cache
//!                          │
//!              ┌───────────┴───────────┐
//!              ▼                       ▼
//!     handlers::graphql (75)   handlers::rest (50)
//!              │                       │
//!              └───────────┬───────────┘
//!                          ▼
//!     Client Response ◀── http::Response (JSON / XML / text)
//! ```
//!
//! # Startup
//! args → config → logging → metrics → bind → serve until SIGINT/SIGTERM

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use api_dispatch::config::{load_or_default, validate_config, ConfigError, ConfigWatcher};
use api_dispatch::lifecycle::{wait_for_signal, Shutdown};
use api_dispatch::observability::{logging, metrics};
use api_dispatch::{Error, HttpServer};

#[derive(Parser)]
#[command(name = "api-dispatch")]
#[command(about = "Serve REST and GraphQL from one endpoint", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `listener.bind_address`
    #[arg(short, long)]
    bind: Option<String>,

    /// Reload the configuration file when it changes
    #[arg(short, long, requires = "config")]
    watch: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    let mut config = load_or_default(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    if cli.check {
        println!("configuration OK");
        println!("  bind address:  {}", config.listener.bind_address);
        println!("  cors:          {} (origin {})", config.cors.enabled, config.cors.origin);
        println!("  diagnostics:   {}", config.diagnostics.enabled);
        println!("  metrics:       {}", config.observability.metrics_enabled);
        return Ok(());
    }

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-dispatch starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        cors_enabled = config.cors.enabled,
        diagnostics = config.diagnostics.enabled,
        request_timeout_secs = config.listener.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse().map_err(|_| {
            Error::InvalidAddress {
                field: "observability.metrics_address",
                value: config.observability.metrics_address.clone(),
            }
        })?;
        metrics::init_metrics(addr)?;
    }

    // The watcher stops when dropped, so it lives until main returns.
    let (_watcher, reloads) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, reloads) = ConfigWatcher::new(path);
            (Some(watcher.run()?), reloads)
        }
        _ => {
            let (_, reloads) = mpsc::unbounded_channel();
            (None, reloads)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config);
    let serving = tokio::spawn(server.run(listener, reloads, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();
    serving.await.map_err(std::io::Error::other)??;

    tracing::info!("Shutdown complete");
    Ok(())
}
