use crate::config::{is_plain_identifier, ConfigError, ConfigResult, ConfigSource};
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Logical name of the primary target database in the control table
pub const DATABASE_NAME: &str = "database_name";

/// Default name of the control database
pub const MIGRATION_DATABASE_NAME: &str = "migrations";

/// Default directory scanned for migration scripts
pub const MIGRATIONS_FOLDER: &str = "scripts";

/// Default tracking table inside the control database
pub const MIGRATIONS_TABLE: &str = "migrations";

pub const ENV_HOST: &str = "POSTGRESQL_URL";
pub const ENV_PORT: &str = "POSTGRESQL_PORT";
pub const ENV_DBNAME: &str = "POSTGRESQL_DBNAME";
pub const ENV_MIGRATION_DBNAME: &str = "POSTGRESQL_MIGRATION_DBNAME";
pub const ENV_USER: &str = "POSTGRESQL_USER";
pub const ENV_PASSWORD: &str = "POSTGRESQL_PASSWORD";
pub const ENV_SSLMODE: &str = "POSTGRESQL_SSLMODE";
pub const ENV_MIGRATIONS_DIR: &str = "MIGRATIONS_DIR";
pub const ENV_MIGRATIONS_TABLE: &str = "MIGRATIONS_TABLE";
pub const ENV_TRACKED_DATABASE: &str = "MIGRATIONS_DATABASE_NAME";

/// Configuration trait for values loaded from the process environment
pub trait AppConfigTrait: Sized {
    /// Load configuration from environment variables
    fn from_env() -> ConfigResult<Self>;

    /// Validate the configuration
    fn validate(&self) -> ConfigResult<()>;

    /// Get configuration source information for debugging
    fn config_sources(&self) -> HashMap<String, ConfigSource>;
}

/// TLS negotiation mode for both database connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    Disable,
    Prefer,
    Require,
}

impl FromStr for SslMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            _ => Err(ConfigError::invalid_value(
                "ssl_mode",
                s,
                "disable, prefer, or require",
            )),
        }
    }
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self {
            SslMode::Disable => "disable",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
        };
        write!(f, "{}", mode)
    }
}

/// Connection parameters for a single database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub ssl_mode: SslMode,
}

/// Runtime configuration for a migration run.
///
/// The target and control databases share host, port and credentials and
/// differ only by database name.
#[derive(Debug, Clone, Serialize)]
pub struct MigratorConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub ssl_mode: SslMode,
    /// Database the scripts are applied to
    pub target_database: String,
    /// Database holding the tracking table
    pub control_database: String,
    pub migrations_dir: PathBuf,
    pub migrations_table: String,
    /// Logical name recorded in the tracking table for the target database
    pub tracked_database: String,
    #[serde(skip)]
    sources: HashMap<String, ConfigSource>,
}

impl MigratorConfig {
    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated the same as unset ones and fall back to the
    /// documented default.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut sources = HashMap::new();
        let mut read = |field: &str, key: &str, default: Option<&str>| -> Option<String> {
            match lookup(key).filter(|value| !value.is_empty()) {
                Some(value) => {
                    sources.insert(field.to_string(), ConfigSource::EnvVar(key.to_string()));
                    Some(value)
                }
                None => {
                    let default = default?;
                    sources.insert(field.to_string(), ConfigSource::Default(default.to_string()));
                    Some(default.to_string())
                }
            }
        };

        let host = read("host", ENV_HOST, Some("localhost")).unwrap_or_default();
        let port_str = read("port", ENV_PORT, Some("5432")).unwrap_or_default();
        let target_database = read("target_database", ENV_DBNAME, Some(DATABASE_NAME)).unwrap_or_default();
        let control_database =
            read("control_database", ENV_MIGRATION_DBNAME, Some(MIGRATION_DATABASE_NAME)).unwrap_or_default();
        let username = read("username", ENV_USER, None);
        let password = read("password", ENV_PASSWORD, None);
        let ssl_mode_str = read("ssl_mode", ENV_SSLMODE, Some("disable")).unwrap_or_default();
        let migrations_dir = read("migrations_dir", ENV_MIGRATIONS_DIR, Some(MIGRATIONS_FOLDER)).unwrap_or_default();
        let migrations_table = read("migrations_table", ENV_MIGRATIONS_TABLE, Some(MIGRATIONS_TABLE)).unwrap_or_default();
        let tracked_database = read("tracked_database", ENV_TRACKED_DATABASE, Some(DATABASE_NAME)).unwrap_or_default();

        let port = port_str.parse::<u16>().map_err(|_| {
            ConfigError::invalid_value("port", port_str.clone(), "valid port number (1-65535)")
        })?;
        let ssl_mode = ssl_mode_str.parse()?;

        Ok(Self {
            host,
            port,
            username,
            password,
            ssl_mode,
            target_database,
            control_database,
            migrations_dir: PathBuf::from(migrations_dir),
            migrations_table,
            tracked_database,
            sources,
        })
    }

    /// Override the migrations directory (e.g. from a CLI flag)
    pub fn with_migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self.sources
            .insert("migrations_dir".to_string(), ConfigSource::Programmatic);
        self
    }

    /// `field=source` pairs sorted by field, for the startup log
    pub fn sources_summary(&self) -> String {
        let mut pairs: Vec<_> = self
            .sources
            .iter()
            .map(|(field, source)| format!("{}={}", field, source))
            .collect();
        pairs.sort();
        pairs.join(", ")
    }

    /// Connection settings for the database being migrated
    pub fn target(&self) -> DatabaseSettings {
        self.settings_for(&self.target_database)
    }

    /// Connection settings for the database holding the tracking table
    pub fn control(&self) -> DatabaseSettings {
        self.settings_for(&self.control_database)
    }

    fn settings_for(&self, database: &str) -> DatabaseSettings {
        DatabaseSettings {
            host: self.host.clone(),
            port: self.port,
            database: database.to_string(),
            username: self.username.clone(),
            password: self.password.clone(),
            ssl_mode: self.ssl_mode,
        }
    }
}

impl AppConfigTrait for MigratorConfig {
    fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 {
            return Err(ConfigError::validation_failed("port", "Port cannot be 0"));
        }

        if !is_plain_identifier(&self.migrations_table) {
            return Err(ConfigError::invalid_value(
                "migrations_table",
                self.migrations_table.clone(),
                "a plain SQL identifier (letters, digits and underscores)",
            ));
        }

        if self.tracked_database.trim().is_empty() {
            return Err(ConfigError::validation_failed(
                "tracked_database",
                "Tracked database name cannot be blank",
            ));
        }

        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        self.sources.clone()
    }
}
