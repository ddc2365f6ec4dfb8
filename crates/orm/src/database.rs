//! Database Integration - PostgreSQL pools for the target and control databases

use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use std::time::Duration;
use stepsql_core::config::{DatabaseSettings, SslMode};

use crate::error::{MigrationError, MigrationResult};

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
}

impl Default for PoolConfig {
    /// One connection per database; a run never issues concurrent queries.
    fn default() -> Self {
        Self {
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: 30,
        }
    }
}

/// Build sqlx connect options from resolved settings
pub fn connect_options(settings: &DatabaseSettings) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .database(&settings.database)
        .ssl_mode(match settings.ssl_mode {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require => PgSslMode::Require,
        })
        .application_name("stepsql");

    if let Some(username) = &settings.username {
        options = options.username(username);
    }
    if let Some(password) = &settings.password {
        options = options.password(password);
    }

    options
}

/// Open a pool and verify it with a first connection
pub async fn create_database_pool(
    settings: &DatabaseSettings,
    config: &PoolConfig,
) -> MigrationResult<PgPool> {
    tracing::debug!(
        "Creating database pool for {}@{}:{} with config: max={}, min={}, timeout={}s",
        settings.database,
        settings.host,
        settings.port,
        config.max_connections,
        config.min_connections,
        config.acquire_timeout
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout))
        .connect_with(connect_options(settings))
        .await
        .map_err(|e| {
            MigrationError::Connection(format!(
                "Failed to connect to {} at {}:{}: {}",
                settings.database, settings.host, settings.port, e
            ))
        })?;

    tracing::info!("Connected to database {}", settings.database);
    Ok(pool)
}
