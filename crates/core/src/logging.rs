//! # Structured Logging
//!
//! Builds the tracing subscriber for a migration run. The subscriber is
//! returned as a [`Dispatch`] so the caller decides its scope instead of it
//! being installed as a process-wide global behind the caller's back.

use serde_json::json;
use std::io;
use thiserror::Error;
use tracing::Dispatch;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, EnvFilter};

/// Environment variable selecting the output format (`json`, `text`, `pretty`)
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Unknown log format '{0}', expected json, text, or pretty")]
    UnknownFormat(String),
}

/// Logging configuration for a migration run
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Enable JSON structured logging (vs plain text)
    pub json_format: bool,
    /// Enable pretty printing for development
    pub pretty_print: bool,
    /// Include file and line number information
    pub include_location: bool,
    /// Filter used when `RUST_LOG` is unset (e.g. "stepsql_orm=debug,sqlx=warn")
    pub env_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LoggingConfig {
    /// JSON lines at info, the format deploy pipelines ingest
    pub fn production() -> Self {
        Self {
            json_format: true,
            pretty_print: false,
            include_location: false,
            env_filter: "info,sqlx=warn".to_string(),
        }
    }

    /// Human readable output with locations
    pub fn development() -> Self {
        Self {
            json_format: false,
            pretty_print: true,
            include_location: true,
            env_filter: "debug,sqlx=info".to_string(),
        }
    }

    /// Minimal output
    pub fn test() -> Self {
        Self {
            json_format: false,
            pretty_print: false,
            include_location: false,
            env_filter: "error".to_string(),
        }
    }

    /// Pick a preset from `LOG_FORMAT`, defaulting to production JSON
    pub fn from_env() -> Result<Self, LoggingError> {
        match std::env::var(ENV_LOG_FORMAT) {
            Ok(format) if !format.is_empty() => Self::for_format(&format),
            _ => Ok(Self::production()),
        }
    }

    /// Map a format name onto a preset
    pub fn for_format(format: &str) -> Result<Self, LoggingError> {
        match format.to_lowercase().as_str() {
            "json" => Ok(Self::production()),
            "pretty" => Ok(Self::development()),
            "text" => Ok(Self {
                json_format: false,
                pretty_print: false,
                ..Self::production()
            }),
            other => Err(LoggingError::UnknownFormat(other.to_string())),
        }
    }

    /// Build the subscriber. `RUST_LOG` takes precedence over the configured filter.
    pub fn build_dispatch(&self) -> Result<Dispatch, LoggingError> {
        let filter =
            EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&self.env_filter))?;

        let base = Layer::new()
            .with_writer(io::stdout)
            .with_file(self.include_location)
            .with_line_number(self.include_location);

        let dispatch = if self.json_format {
            Dispatch::new(tracing_subscriber::registry().with(filter).with(base.json()))
        } else if self.pretty_print {
            Dispatch::new(tracing_subscriber::registry().with(filter).with(base.pretty()))
        } else {
            Dispatch::new(tracing_subscriber::registry().with(filter).with(base))
        };

        Ok(dispatch)
    }
}

/// Log process startup with system information
pub fn log_startup_info(service_name: &str, service_version: &str) {
    let startup_info = json!({
        "event": "application_startup",
        "service": service_name,
        "version": service_version,
        "pid": std::process::id(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "os": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
    });

    tracing::info!(target: "stepsql::startup", "{}", startup_info);
}

/// Log process shutdown
pub fn log_shutdown_info(service_name: &str, success: bool) {
    let shutdown_info = json!({
        "event": "application_shutdown",
        "service": service_name,
        "success": success,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    tracing::info!(target: "stepsql::shutdown", "{}", shutdown_info);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_presets() {
        let prod = LoggingConfig::production();
        assert!(prod.json_format);
        assert!(!prod.pretty_print);
        assert_eq!(prod.env_filter, "info,sqlx=warn");

        let dev = LoggingConfig::development();
        assert!(!dev.json_format);
        assert!(dev.pretty_print);
        assert!(dev.include_location);

        let test = LoggingConfig::test();
        assert_eq!(test.env_filter, "error");
    }

    #[test]
    fn test_for_format() {
        assert!(LoggingConfig::for_format("JSON").unwrap().json_format);
        assert!(LoggingConfig::for_format("pretty").unwrap().pretty_print);

        let text = LoggingConfig::for_format("text").unwrap();
        assert!(!text.json_format);
        assert!(!text.pretty_print);

        assert!(matches!(
            LoggingConfig::for_format("xml"),
            Err(LoggingError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_text_format_keeps_production_filter() {
        let text = LoggingConfig::for_format("text").unwrap();
        assert_eq!(text.env_filter, LoggingConfig::production().env_filter);
        assert!(!text.include_location);
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let config = LoggingConfig {
            env_filter: "stepsql=notalevel".to_string(),
            ..LoggingConfig::test()
        };
        if std::env::var("RUST_LOG").is_err() {
            assert!(matches!(
                config.build_dispatch(),
                Err(LoggingError::InvalidFilter(_))
            ));
        }
    }

    #[test]
    fn test_dispatch_is_scoped() {
        let dispatch = LoggingConfig::test().build_dispatch().unwrap();

        tracing::dispatcher::with_default(&dispatch, || {
            log_startup_info("stepsql", "test");
            log_shutdown_info("stepsql", true);
        });
    }
}
