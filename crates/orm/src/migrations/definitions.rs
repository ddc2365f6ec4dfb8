//! Migration Definitions - Core types shared by the loader, state store and runner

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use stepsql_core::config::{MigratorConfig, DATABASE_NAME, MIGRATIONS_FOLDER, MIGRATIONS_TABLE};

/// Direction marker encoded in a migration file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationDirection {
    /// Forward script, applied by the runner
    Up,
    /// Rollback script. Parsed and reported, never executed.
    Down,
}

impl MigrationDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationDirection::Up => "up",
            MigrationDirection::Down => "down",
        }
    }
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One migration file discovered on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationDescriptor {
    /// Ordering key taken from the file name prefix
    pub sequence_number: i64,
    /// Human-readable part of the prefix, after the first underscore
    pub name: String,
    pub file_name: String,
    pub file_path: PathBuf,
    pub direction: MigrationDirection,
    /// Informational only
    pub extension: String,
}

impl fmt::Display for MigrationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} | {}",
            self.sequence_number, self.name, self.direction, self.extension
        )
    }
}

/// Watermark row for one logical database in the tracking table.
///
/// `applied_count` counts successfully applied scripts. It is advanced by one
/// per script, not set to the script's sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationState {
    pub database_name: String,
    pub applied_count: i32,
    pub last_updated: DateTime<Utc>,
}

impl MigrationState {
    /// A fresh state as inserted for a database seen for the first time
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            applied_count: 0,
            last_updated: Utc::now(),
        }
    }

    /// Whether a script with this sequence number is already covered by the watermark
    pub fn covers(&self, sequence_number: i64) -> bool {
        sequence_number <= i64::from(self.applied_count)
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.database_name, self.applied_count)
    }
}

/// What a state write actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Updated,
    /// The row was missing or its count changed underneath us
    NoRowMatched,
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Directory where migration files are stored
    pub migrations_dir: PathBuf,
    /// Table name for tracking migrations
    pub migrations_table: String,
    /// Logical database name the watermark is stored under
    pub tracked_database: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from(MIGRATIONS_FOLDER),
            migrations_table: MIGRATIONS_TABLE.to_string(),
            tracked_database: DATABASE_NAME.to_string(),
        }
    }
}

impl From<&MigratorConfig> for MigrationConfig {
    fn from(config: &MigratorConfig) -> Self {
        Self {
            migrations_dir: config.migrations_dir.clone(),
            migrations_table: config.migrations_table.clone(),
            tracked_database: config.tracked_database.clone(),
        }
    }
}

/// Result of running migrations
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationRunResult {
    /// File names applied during this run, in order
    pub applied: Vec<String>,
    /// Files already covered by the watermark
    pub skipped_count: usize,
    /// Down files that were left alone
    pub ignored_count: usize,
    /// Watermark after the run
    pub final_count: i32,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl MigrationRunResult {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}
