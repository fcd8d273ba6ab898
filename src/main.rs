//! Login relay server.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 LOGIN RELAY                  │
//!     Browser request    │  ┌────────┐    ┌────────┐    ┌───────────┐   │
//!     ───────────────────┼─▶│  http  │───▶│ relay  │───▶│    hop    │───┼──▶ Identity
//!                        │  │ server │    │ flows  │    │ (HTTP/2)  │   │    provider
//!     302 + Set-Cookie   │  └────────┘    └────────┘    └───────────┘   │
//!     ◀──────────────────┼──────────────────────────────────────────────│
//!                        │  config · observability · resilience ·       │
//!                        │  lifecycle                                   │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::net::TcpListener;

use login_relay::config::loader::{default_config, load_config};
use login_relay::http::HttpServer;
use login_relay::lifecycle::{spawn_signal_listener, Shutdown};
use login_relay::net::tls::load_tls_config;
use login_relay::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "login-relay")]
#[command(about = "Relays a hosted identity provider's login handshake", long_about = None)]
struct Args {
    /// Path to a TOML config file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match args.config.as_deref() {
        Some(path) => load_config(path)?,
        None => default_config()?,
    };

    logging::init(&config.observability.log_level);
    tracing::info!("login-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        login_url = %config.provider.login_url,
        hop_timeout_secs = config.timeouts.hop_secs,
        tls = config.listener.tls.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    match tls {
        Some(tls) => {
            let addr: SocketAddr = bind_address.parse()?;
            let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
            server.run_tls(addr, rustls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
