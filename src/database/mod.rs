use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub mod models;

/// Errors from database bootstrap
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

fn database_url() -> Result<String, DatabaseError> {
    std::env::var("DATABASE_URL").map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))
}

/// Connect the application pool from DATABASE_URL
pub async fn connect_pool() -> Result<PgPool, DatabaseError> {
    let cfg = &crate::config::config().database;
    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .connect(&database_url()?)
        .await?;

    info!(
        "Created database pool ({} max connections)",
        cfg.max_connections
    );
    Ok(pool)
}

/// Pool that connects on first use. Lets request-free code paths (and tests
/// that never touch persistence) build an AppState without a live database.
pub fn connect_pool_lazy() -> Result<PgPool, DatabaseError> {
    let url = database_url().unwrap_or_else(|_| "postgres://localhost/huddle".to_string());
    Ok(PgPoolOptions::new().connect_lazy(&url)?)
}

/// Pings the pool to ensure connectivity
pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
