//! # stepsql-core
//!
//! Configuration and logging shared by the stepsql crates.

pub mod config;
pub mod logging;

pub use config::{
    AppConfigTrait, ConfigError, ConfigResult, ConfigSource, DatabaseSettings, MigratorConfig,
    SslMode, DATABASE_NAME,
};
pub use logging::{log_shutdown_info, log_startup_info, LoggingConfig, LoggingError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tool name used in startup and shutdown events
pub const SERVICE_NAME: &str = "stepsql";
