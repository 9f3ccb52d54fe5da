use crate::config::DatabaseConfig;
use serde::Serialize;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Migrations compiled into the binary
static EMBEDDED_MIGRATIONS: Migrator = sqlx::migrate!("./migrations");

const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Pool set-up, liveness and migration failures
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    Connect(sqlx::Error),

    #[error("Database did not answer: {0}")]
    Unavailable(sqlx::Error),

    #[error("Database ping timed out")]
    PingTimeout,

    #[error("Database migration failed: {0}")]
    Migration(#[from] MigrateError),
}

/// Connection counts reported by the health endpoint
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoolStatus {
    pub connections: u32,
    pub idle: usize,
}

/// Shared handle to the Postgres pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `SELECT 1` bounded by a short timeout
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        match tokio::time::timeout(PING_TIMEOUT, sqlx::query("SELECT 1").execute(&self.pool)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(DatabaseError::Unavailable(e)),
            Err(_) => Err(DatabaseError::PingTimeout),
        }
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            connections: self.pool.size(),
            idle: self.pool.num_idle(),
        }
    }
}

/// Open the pool and verify one connection before returning it
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .test_before_acquire(config.test_before_acquire)
        .connect(&config.url)
        .await
        .map_err(DatabaseError::Connect)?;

    Database::new(pool.clone()).ping().await?;
    debug!("Database pool ready ({} max connections)", config.max_connections);

    Ok(pool)
}

/// Apply pending migrations.
///
/// `None` runs the set embedded at build time; a path loads them from disk.
pub async fn run_migrations(pool: &PgPool, migrations_path: Option<&str>) -> Result<(), DatabaseError> {
    match migrations_path {
        Some(path) => {
            info!("Applying migrations from {}", path);
            let migrator = Migrator::new(Path::new(path)).await?;
            migrator.run(pool).await?;
        }
        None => {
            info!(
                "Applying {} embedded migration(s)",
                EMBEDDED_MIGRATIONS.iter().count()
            );
            EMBEDDED_MIGRATIONS.run(pool).await?;
        }
    }

    Ok(())
}
