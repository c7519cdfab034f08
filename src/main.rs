//! Paddle Relay Server
//!
//! Receives Paddle Billing webhooks and mirrors them into Supabase.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use paddle_relay::config::Config;
use paddle_relay::cors::{cors_layer_with_config, CorsConfig};
use paddle_relay::server::{router, serve, AppState};

/// Paddle Relay Server
#[derive(Parser, Debug)]
#[command(name = "paddle-relay")]
#[command(version)]
#[command(about = "Paddle Billing webhook receiver backed by Supabase")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5000")]
    port: u16,

    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Keep tables in process memory instead of Supabase
    #[arg(long)]
    in_memory_store: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let default_filter = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    paddle_relay::metrics::init();

    let config = Config::from_env(args.in_memory_store).context("loading configuration")?;
    let state = AppState::from_config(&config).context("building clients")?;
    let cors = cors_layer_with_config(CorsConfig::new().with_origins(config.cors_origins.clone()));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", args.host, args.port))?;

    tracing::info!(
        "{} {} starting on {} ({:?})",
        paddle_relay::NAME,
        paddle_relay::VERSION,
        addr,
        config.paddle.environment
    );

    serve(addr, router(Arc::new(state), cors)).await?;
    Ok(())
}
