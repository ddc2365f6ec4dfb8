//! Migration State Store - the watermark table in the control database

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use stepsql_core::config::is_plain_identifier;

use super::definitions::{MigrationConfig, MigrationState, PersistOutcome};
use crate::error::{MigrationError, MigrationResult};

/// Storage for per-database watermarks
#[async_trait]
pub trait MigrationStateStore: Send + Sync {
    /// Create the tracking table and its unique index if absent
    async fn ensure_table(&self) -> MigrationResult<()>;

    /// Read the state for `database_name`, inserting a zero row the first time
    async fn fetch_or_create(&self, database_name: &str) -> MigrationResult<MigrationState>;

    /// Write `state` only if the stored count still equals `previous_count`
    async fn persist(
        &self,
        state: &MigrationState,
        previous_count: i32,
    ) -> MigrationResult<PersistOutcome>;
}

#[async_trait]
impl<T: MigrationStateStore + ?Sized> MigrationStateStore for Arc<T> {
    async fn ensure_table(&self) -> MigrationResult<()> {
        (**self).ensure_table().await
    }

    async fn fetch_or_create(&self, database_name: &str) -> MigrationResult<MigrationState> {
        (**self).fetch_or_create(database_name).await
    }

    async fn persist(
        &self,
        state: &MigrationState,
        previous_count: i32,
    ) -> MigrationResult<PersistOutcome> {
        (**self).persist(state, previous_count).await
    }
}

/// PostgreSQL implementation over the control database pool
pub struct PgStateStore {
    pool: PgPool,
    table: String,
}

impl PgStateStore {
    pub fn new(pool: PgPool, table: impl Into<String>) -> MigrationResult<Self> {
        let table = table.into();
        if !is_plain_identifier(&table) {
            return Err(MigrationError::State(format!(
                "'{}' is not a valid tracking table name",
                table
            )));
        }
        Ok(Self { pool, table })
    }

    /// Store over the tracking table named in `config`
    pub fn for_config(pool: PgPool, config: &MigrationConfig) -> MigrationResult<Self> {
        Self::new(pool, config.migrations_table.as_str())
    }

    async fn fetch(&self, database_name: &str) -> MigrationResult<Option<MigrationState>> {
        let row = sqlx::query(&self.select_state_sql())
            .bind(database_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MigrationError::State(format!("Failed to read migration state: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let database_name: String = row
            .try_get("database_name")
            .map_err(|e| MigrationError::State(format!("Failed to get database_name: {}", e)))?;
        let applied_count: i32 = row
            .try_get("state")
            .map_err(|e| MigrationError::State(format!("Failed to get state: {}", e)))?;
        let last_updated: DateTime<Utc> = row
            .try_get("last_updated")
            .map_err(|e| MigrationError::State(format!("Failed to get last_updated: {}", e)))?;

        Ok(Some(MigrationState {
            database_name,
            applied_count,
            last_updated,
        }))
    }

    /// SQL to create the migrations tracking table
    pub fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                database_name TEXT NOT NULL,\n    \
                state INT NOT NULL DEFAULT 0,\n    \
                last_updated TIMESTAMP WITH TIME ZONE NOT NULL\n\
            );",
            self.table
        )
    }

    /// SQL to enforce one row per logical database
    pub fn create_index_sql(&self) -> String {
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {0}_database_name_key ON {0} (database_name);",
            self.table
        )
    }

    pub fn select_state_sql(&self) -> String {
        format!(
            "SELECT database_name, state, last_updated FROM {} WHERE database_name = $1",
            self.table
        )
    }

    pub fn insert_state_sql(&self) -> String {
        format!(
            "INSERT INTO {} (database_name, state, last_updated) VALUES ($1, 0, NOW()) \
             ON CONFLICT (database_name) DO NOTHING",
            self.table
        )
    }

    pub fn update_state_sql(&self) -> String {
        format!(
            "UPDATE {} SET state = $1, last_updated = $2 WHERE database_name = $3 AND state = $4",
            self.table
        )
    }
}

#[async_trait]
impl MigrationStateStore for PgStateStore {
    async fn ensure_table(&self) -> MigrationResult<()> {
        for sql in [self.create_table_sql(), self.create_index_sql()] {
            sqlx::query(&sql).execute(&self.pool).await.map_err(|e| {
                MigrationError::State(format!("Failed to create migrations table: {}", e))
            })?;
        }
        tracing::info!("Validated migration table {}", self.table);
        Ok(())
    }

    async fn fetch_or_create(&self, database_name: &str) -> MigrationResult<MigrationState> {
        if let Some(state) = self.fetch(database_name).await? {
            return Ok(state);
        }

        sqlx::query(&self.insert_state_sql())
            .bind(database_name)
            .execute(&self.pool)
            .await
            .map_err(|e| MigrationError::State(format!("Failed to create migration state: {}", e)))?;
        tracing::info!("Created migration state for {}", database_name);

        // Re-read so the returned state is exactly what was stored.
        self.fetch(database_name).await?.ok_or_else(|| {
            MigrationError::State(format!(
                "Migration state for {} missing after insert",
                database_name
            ))
        })
    }

    async fn persist(
        &self,
        state: &MigrationState,
        previous_count: i32,
    ) -> MigrationResult<PersistOutcome> {
        let result = sqlx::query(&self.update_state_sql())
            .bind(state.applied_count)
            .bind(state.last_updated)
            .bind(&state.database_name)
            .bind(previous_count)
            .execute(&self.pool)
            .await
            .map_err(|e| MigrationError::State(format!("Failed to update migration state: {}", e)))?;

        if result.rows_affected() == 0 {
            Ok(PersistOutcome::NoRowMatched)
        } else {
            Ok(PersistOutcome::Updated)
        }
    }
}
