//! Migration System
//!
//! File discovery, watermark storage and ordered execution of SQL scripts.

pub mod definitions;
pub mod executor;
pub mod filename;
pub mod manager;
pub mod runner;
pub mod state;

pub use definitions::*;
pub use executor::{PgScriptExecutor, ScriptExecutor};
pub use filename::parse_file_name;
pub use manager::MigrationManager;
pub use runner::MigrationRunner;
pub use state::{MigrationStateStore, PgStateStore};
