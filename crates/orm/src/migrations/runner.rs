//! Migration Runner - Executes migrations against the database
//!
//! Loads descriptors, orders them by sequence number and walks them against
//! the stored watermark. Each script that runs advances the watermark by one
//! and the new value is written before the next script starts, so an aborted
//! run leaves the control table consistent with what actually ran.

use chrono::Utc;
use std::fs;
use std::time::Instant;

use super::definitions::{
    MigrationDescriptor, MigrationDirection, MigrationRunResult, MigrationState, PersistOutcome,
};
use super::executor::ScriptExecutor;
use super::manager::MigrationManager;
use super::state::MigrationStateStore;
use crate::error::{MigrationError, MigrationResult};

/// Migration runner that executes migrations against a database
pub struct MigrationRunner<S, E> {
    manager: MigrationManager,
    store: S,
    executor: E,
}

impl<S, E> MigrationRunner<S, E>
where
    S: MigrationStateStore,
    E: ScriptExecutor,
{
    /// Create a new migration runner
    pub fn new(manager: MigrationManager, store: S, executor: E) -> Self {
        Self {
            manager,
            store,
            executor,
        }
    }

    /// Apply every up migration beyond the stored watermark.
    ///
    /// Returns at the first script that fails; the watermark then reflects the
    /// scripts applied before it and the failed one is retried next run.
    pub async fn run_migrations(&self) -> MigrationResult<MigrationRunResult> {
        let start_time = Instant::now();
        let config = self.manager.config();

        let mut migrations = self.manager.load_migrations()?;
        if migrations.is_empty() {
            tracing::info!("No migration files found in {}", config.migrations_dir.display());
            return Ok(MigrationRunResult {
                execution_time_ms: start_time.elapsed().as_millis(),
                ..MigrationRunResult::default()
            });
        }

        sort_migrations(&mut migrations);

        let mut state = self.store.fetch_or_create(&config.tracked_database).await?;
        tracing::info!("Migration state | {}", state);

        let mut result = MigrationRunResult::default();
        for migration in &migrations {
            if migration.direction == MigrationDirection::Down {
                tracing::warn!("IGNORE  | {} | rollback scripts are not executed", migration);
                result.ignored_count += 1;
                continue;
            }

            if state.covers(migration.sequence_number) {
                tracing::info!("SKIP    | {}", migration);
                result.skipped_count += 1;
                continue;
            }

            self.apply_migration(migration, &mut state).await?;
            result.applied.push(migration.file_name.clone());
        }

        // Always the stored value, even after an unmatched write.
        result.final_count = state.applied_count;
        result.execution_time_ms = start_time.elapsed().as_millis();
        Ok(result)
    }

    /// Apply a single migration and advance the watermark
    async fn apply_migration(
        &self,
        migration: &MigrationDescriptor,
        state: &mut MigrationState,
    ) -> MigrationResult<()> {
        let script = fs::read_to_string(&migration.file_path)
            .map_err(|e| MigrationError::io(&migration.file_path, e))?;

        if script.trim().is_empty() {
            tracing::warn!("Migration {} is empty", migration.file_name);
        } else {
            self.executor
                .execute_script(&migration.file_name, &script)
                .await?;
        }

        let previous_count = state.applied_count;
        state.last_updated = Utc::now();
        state.applied_count += 1;

        match self.store.persist(state, previous_count).await? {
            PersistOutcome::Updated => {}
            PersistOutcome::NoRowMatched => {
                let stored = self.store.fetch_or_create(&state.database_name).await?;
                tracing::warn!(
                    database = %state.database_name,
                    expected_state = previous_count,
                    stored_state = stored.applied_count,
                    "Migration state update matched no row; continuing from the stored watermark"
                );
                *state = stored;
            }
        }

        tracing::info!("SUCCESS | {}", migration);
        Ok(())
    }
}

/// Order by sequence number; ties fall back to file name so the order never
/// depends on how the filesystem lists the directory.
fn sort_migrations(migrations: &mut [MigrationDescriptor]) {
    migrations.sort_by(|a, b| {
        a.sequence_number
            .cmp(&b.sequence_number)
            .then_with(|| a.file_name.cmp(&b.file_name))
    });
}
