mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use stepsql_core::{
    log_shutdown_info, log_startup_info, AppConfigTrait, LoggingConfig, MigratorConfig,
    SERVICE_NAME, VERSION,
};
use stepsql_orm::MigrationError;

#[derive(Parser, Debug)]
#[command(name = "stepsql")]
#[command(about = "Apply versioned SQL scripts to PostgreSQL exactly once")]
#[command(version)]
struct Cli {
    /// Migrations directory (overrides MIGRATIONS_DIR)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Apply pending migrations (the default)
    Up,

    /// Create the next numbered migration file
    New {
        /// Migration title, e.g. "add orders index"
        #[arg(required = true)]
        title: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let dispatch = match LoggingConfig::from_env().and_then(|config| config.build_dispatch()) {
        Ok(dispatch) => dispatch,
        Err(e) => {
            eprintln!("stepsql: {}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::dispatcher::with_default(&dispatch, || {
        log_startup_info(SERVICE_NAME, VERSION);

        match execute(cli) {
            Ok(()) => {
                log_shutdown_info(SERVICE_NAME, true);
                ExitCode::SUCCESS
            }
            Err(e) => {
                let kind = e
                    .chain()
                    .find_map(|cause| cause.downcast_ref::<MigrationError>())
                    .map(MigrationError::kind)
                    .unwrap_or("startup");
                tracing::error!(error = %format!("{:#}", e), kind = kind, "Migration run aborted");
                log_shutdown_info(SERVICE_NAME, false);
                ExitCode::FAILURE
            }
        }
    })
}

fn execute(cli: Cli) -> anyhow::Result<()> {
    let mut config = MigratorConfig::from_env().context("Invalid configuration")?;
    if let Some(dir) = cli.dir {
        config = config.with_migrations_dir(dir);
    }
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        config = %serde_json::to_string(&config)?,
        sources = %config.sources_summary(),
        "Configuration loaded"
    );

    match cli.command.unwrap_or(Commands::Up) {
        Commands::Up => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;

            let result = runtime.block_on(commands::migrate::run(&config))?;
            tracing::info!(
                applied = result.applied_count(),
                skipped = result.skipped_count,
                ignored = result.ignored_count,
                state = result.final_count,
                execution_time_ms = result.execution_time_ms as u64,
                "Migrations complete"
            );
            Ok(())
        }
        Commands::New { title } => commands::migrate::create(&config, &title.join(" ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_up() {
        let cli = Cli::try_parse_from(["stepsql"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.dir, None);
    }

    #[test]
    fn test_parses_new_with_multi_word_title() {
        let cli = Cli::try_parse_from(["stepsql", "new", "add", "orders", "--dir", "db"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::New {
                title: vec!["add".to_string(), "orders".to_string()]
            })
        );
        assert_eq!(cli.dir, Some(PathBuf::from("db")));
    }

    #[test]
    fn test_new_requires_title() {
        assert!(Cli::try_parse_from(["stepsql", "new"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
