//! Script execution against the target database

use async_trait::async_trait;
use sqlx::{Executor, PgPool};
use std::sync::Arc;

use crate::error::{MigrationError, MigrationResult};

/// Runs the full text of one migration script
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    async fn execute_script(&self, migration: &str, sql: &str) -> MigrationResult<()>;
}

#[async_trait]
impl<T: ScriptExecutor + ?Sized> ScriptExecutor for Arc<T> {
    async fn execute_script(&self, migration: &str, sql: &str) -> MigrationResult<()> {
        (**self).execute_script(migration, sql).await
    }
}

/// Executes scripts on a PostgreSQL pool.
///
/// The script is sent without bind parameters, which makes sqlx use the simple
/// query protocol: a file holding several statements runs as one batch. No
/// transaction is opened around it.
pub struct PgScriptExecutor {
    pool: PgPool,
}

impl PgScriptExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScriptExecutor for PgScriptExecutor {
    async fn execute_script(&self, migration: &str, sql: &str) -> MigrationResult<()> {
        let result = (&self.pool)
            .execute(sql)
            .await
            .map_err(|e| MigrationError::Execution {
                migration: migration.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!(
            migration = migration,
            rows_affected = result.rows_affected(),
            "Executed migration script"
        );
        Ok(())
    }
}
