//! Users Service - user accounts, credentials and bearer tokens over HTTP/JSON

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use crate::config::{Config, LogFormat, LoggingConfig};
use users_api::{create_router, AppState};
use users_auth::{Argon2Hasher, TokenService};
use users_core::UserDirectory;
use users_db::{Database, MemoryStore, UserStore};

/// Users Service - account registration, login and profiles
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "USERS_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "USERS_PORT")]
    port: Option<u16>,

    /// Keep users in memory instead of the configured database
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)?;

    // Initialize logging
    init_logging(&config.logging);

    info!("Starting Users Service v{}", env!("CARGO_PKG_VERSION"));
    if Path::new(&args.config).exists() {
        info!("Loaded configuration from {}", args.config);
    } else {
        info!("Config file not found at {}, using defaults", args.config);
    }
    if config.uses_placeholder_secret() {
        warn!("auth.jwt_secret is the built-in placeholder; set USERS__AUTH__JWT_SECRET");
    }

    // Initialize user store
    let store: Arc<dyn UserStore> = if args.in_memory || config.database.in_memory {
        info!("Using in-memory user store");
        Arc::new(MemoryStore::new())
    } else {
        if let Some(parent) = config.database.sqlite_file().as_deref().and_then(|p| p.parent()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create database directory {:?}", parent))?;
        }
        Arc::new(Database::new(&config.database.url).await?)
    };

    // Initialize user directory
    let directory = Arc::new(UserDirectory::new(
        store,
        Arc::new(Argon2Hasher::new()),
        (&config.directory).into(),
    )?);

    // Initialize token service
    let tokens = Arc::new(TokenService::new(
        &config.auth.jwt_secret,
        config.auth.token_ttl(),
    ));

    // Install metrics recorder
    let metrics_handle = if config.metrics.enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(Arc::new(handle))
    } else {
        None
    };

    // Create router
    let state = AppState::new(directory, tokens);
    let app = create_router(state, metrics_handle).layer(TraceLayer::new_for_http());

    // Determine bind address
    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;

    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
