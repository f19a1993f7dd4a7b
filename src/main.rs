//! spnego-gateway binary.
//!
//! Wires the SPNEGO middleware in front of a plain forwarding handler:
//!
//! ```text
//! Client ──▶ listener ──▶ spnego middleware ──▶ forward handler ──▶ upstream
//!                         (rewrite + sign +
//!                          refresh-retry)
//! ```
//!
//! With `target_host_segment = 1`, a request to
//! `http://gateway:8080/upstream.example.com:9000/a/b` is forwarded to
//! `http://upstream.example.com:9000/a/b` with a SPNEGO header attached.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spnego_gateway::auth::toolkit::SpnegoToolkit;
use spnego_gateway::config::{loader, GatewayConfig};
use spnego_gateway::http::HttpServer;
use spnego_gateway::observability::metrics;

#[derive(Parser)]
#[command(name = "spnego-gateway", about = "Segment-routing reverse proxy with outbound SPNEGO signing")]
struct Args {
    /// Path to a TOML configuration file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spnego_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => loader::load_config(path)?,
        None => GatewayConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        target_host_segment = config.spnego.target_host_segment,
        spn_overrides = config.spnego.spn_overrides.len(),
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    let server = HttpServer::new(config, default_toolkit())?;
    server.run(listener).await?;

    tracing::info!("shutdown complete");
    Ok(())
}

#[cfg(feature = "gssapi")]
fn default_toolkit() -> Arc<dyn SpnegoToolkit> {
    Arc::new(spnego_gateway::auth::gssapi::CrossKrb5Toolkit)
}

#[cfg(not(feature = "gssapi"))]
fn default_toolkit() -> Arc<dyn SpnegoToolkit> {
    tracing::warn!("built without the gssapi feature; requests will be forwarded unsigned");
    Arc::new(spnego_gateway::auth::toolkit::UnconfiguredToolkit)
}
