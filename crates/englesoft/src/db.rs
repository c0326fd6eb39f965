use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::AppError;

pub type DbPool = PgPool;

/// Connects the Postgres pool and verifies it with a round trip.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, AppError> {
    let url = config.require_url()?;
    tracing::info!(max_connections = config.max_connections, "connecting to postgres");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(url)
        .await?;

    health_check(&pool).await?;
    tracing::info!("postgres pool ready");

    Ok(pool)
}

/// Applies the embedded schema migrations, including the MCER level seed.
pub async fn migrate(pool: &DbPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
