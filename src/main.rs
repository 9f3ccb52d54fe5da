//! xStreet Backend Service
//!
//! Main entry point for the xStreet marketplace backend.
//! This service provides:
//! - HTTP API for pricing cycles, purchases and escrow settlement
//! - XRP Ledger access over JSON-RPC

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use xstreet_backend::auth::SupabaseAuth;
use xstreet_backend::database::{create_pool, run_migrations, Database};
use xstreet_backend::ledger::XrplClient;
use xstreet_backend::{http, AppConfig, AppState, Stores};

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "xstreet_backend={},sqlx=warn,tower_http=info",
            config.log_level
        )
        .into()
    });

    if config.json_logs() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!(e)
    })?;

    init_tracing(&config);

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           xStreet Backend Service Starting               ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("HTTP port: {}", config.http_port);

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        e
    })?;

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    info!("Running database migrations...");
    run_migrations(&pool, None).await.map_err(|e| {
        error!("Database migration failed: {}", e);
        e
    })?;

    info!("Database migrations completed successfully");

    // =========================================================================
    // CORE SERVICES INITIALIZATION
    // =========================================================================
    info!("Initializing core services...");

    info!("XRPL RPC: {}", config.ledger.rpc_url);
    let rpc = Arc::new(XrplClient::new(&config.ledger)?);
    info!("✓ Ledger client initialized");

    let identity = Arc::new(SupabaseAuth::new(config.auth.clone())?);
    info!("✓ Identity verifier initialized");

    if let Some(price) = config.escrow.fixed_price_xrp {
        info!("Purchases use a fixed price of {} XRP", price);
    }

    let state = AppState::from_parts(
        Stores::postgres(pool.clone()),
        rpc,
        identity,
        config.ledger.clone(),
        config.pricing.clone(),
        config.escrow.clone(),
        config.price_feed.clone(),
    )?
    .with_database(Database::new(pool));
    info!("✓ Application state initialized");

    // =========================================================================
    // START SERVER
    // =========================================================================
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server on {}", addr))?;

    let app = http::router(Arc::new(state), &config.allowed_origins);

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           xStreet Backend Service Ready!                 ║");
    info!("╠══════════════════════════════════════════════════════════╣");
    info!("║  HTTP API:     {}", addr);
    info!("║  Environment:  {}", config.environment);
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, shutting down gracefully...");
        }
    })
    .await
    .context("HTTP server exited unexpectedly")?;

    info!("xStreet backend service shutdown complete");
    Ok(())
}
