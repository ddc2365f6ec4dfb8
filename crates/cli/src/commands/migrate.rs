use anyhow::Context;
use sqlx::PgPool;
use stepsql_core::MigratorConfig;
use stepsql_orm::{
    create_database_pool, MigrationConfig, MigrationManager, MigrationRunResult, MigrationRunner,
    MigrationStateStore, PgScriptExecutor, PgStateStore, PoolConfig,
};

/// Scaffold a new up migration in the configured directory
pub fn create(config: &MigratorConfig, title: &str) -> anyhow::Result<()> {
    let manager = MigrationManager::with_config(MigrationConfig::from(config));
    let filename = manager
        .create_migration(title)
        .with_context(|| format!("Failed to create migration '{}'", title))?;

    println!(
        "Created migration: {}",
        manager.config().migrations_dir.join(&filename).display()
    );
    Ok(())
}

/// Connect to both databases, apply pending migrations, and close the pools
/// whether or not the run succeeded.
pub async fn run(config: &MigratorConfig) -> anyhow::Result<MigrationRunResult> {
    let pool_config = PoolConfig::default();

    let control = create_database_pool(&config.control(), &pool_config)
        .await
        .context("Migration database unavailable")?;
    tracing::info!("Migration database connected");

    let result = run_with_control(config, &control, &pool_config).await;
    control.close().await;
    result
}

async fn run_with_control(
    config: &MigratorConfig,
    control: &PgPool,
    pool_config: &PoolConfig,
) -> anyhow::Result<MigrationRunResult> {
    let migration_config = MigrationConfig::from(config);
    let store = PgStateStore::for_config(control.clone(), &migration_config)?;
    store.ensure_table().await?;

    let target = create_database_pool(&config.target(), pool_config)
        .await
        .context("Target database unavailable")?;
    tracing::info!("Postgresql connected");

    let runner = MigrationRunner::new(
        MigrationManager::with_config(migration_config),
        store,
        PgScriptExecutor::new(target.clone()),
    );
    let result = runner.run_migrations().await;
    target.close().await;

    Ok(result?)
}
