//! # stepsql-orm: Database layer for stepsql
//!
//! Discovers versioned SQL scripts, applies the ones beyond the stored
//! watermark to a target PostgreSQL database and records progress in a
//! tracking table held in a separate control database.

pub mod database;
pub mod error;
pub mod migrations;

pub use database::{connect_options, create_database_pool, PoolConfig};
pub use error::{FormatError, MigrationError, MigrationResult};
pub use migrations::*;
