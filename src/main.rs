use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use huddle_api::bus::ChatBus;
use huddle_api::identity::{ClerkOracle, IdentityOracle};
use huddle_api::state::AppState;
use huddle_api::tokens::{self, TokenCache};
use huddle_api::{config, database, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, IDENTITY_SECRET_KEY, etc.
    let _ = dotenvy::dotenv();

    let config = config::config();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting huddle-api in {:?} mode", config.environment);

    let db = database::connect_pool()
        .await
        .context("failed to create database pool")?;

    let tokens = Arc::new(TokenCache::from_config());
    let bus = Arc::new(ChatBus::new());
    let identity: Arc<dyn IdentityOracle> = Arc::new(ClerkOracle::from_config());
    let state = AppState::new(db, Arc::clone(&tokens), bus, identity);

    // Expired capability keys are evicted independently of request traffic
    let _sweeper = tokens::spawn_sweeper(
        tokens,
        Duration::from_secs(config.session.sweep_interval_secs),
    );

    let app = routes::app(state);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("huddle-api listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server")?;
    Ok(())
}
