use anyhow::Context;
use tracing_subscriber::EnvFilter;

use reqhub_api::config;
use reqhub_api::database::DatabaseManager;
use reqhub_api::routes::app;
use reqhub_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting ReqHub API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        if reqhub_api::is_production!() {
            tracing::error!("JWT_SECRET is not set; every protected route will answer 401");
        } else {
            tracing::warn!("JWT_SECRET is not set; every protected route will answer 401");
        }
    }

    // A database that is down at startup is reported through /health
    if config.database.run_migrations {
        if let Err(e) = DatabaseManager::migrate().await {
            tracing::error!("Failed to apply migrations: {}", e);
        }
    }

    let state = AppState::with_database();

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("ReqHub API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    DatabaseManager::close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
