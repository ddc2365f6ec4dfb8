//! Tests against a live PostgreSQL server.
//!
//! Run with `STEPSQL_TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.

use sqlx::{PgPool, Row};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use stepsql_orm::{
    MigrationConfig, MigrationError, MigrationManager, MigrationRunner, MigrationStateStore,
    PersistOutcome, PgScriptExecutor, PgStateStore, ScriptExecutor,
};
use tempfile::TempDir;

async fn test_pool() -> PgPool {
    let url = std::env::var("STEPSQL_TEST_DATABASE_URL")
        .expect("STEPSQL_TEST_DATABASE_URL must point at a scratch database");
    PgPool::connect(&url).await.unwrap()
}

static TABLE_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn unique_name(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    let seq = TABLE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}_{}_{}_{}", prefix, std::process::id(), seq, nanos)
}

#[test]
fn test_unique_names_differ_within_process() {
    assert_ne!(unique_name("stepsql_state"), unique_name("stepsql_state"));
}

async fn drop_table(pool: &PgPool, table: &str) {
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
        .execute(pool)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_fetch_or_create_and_persist() {
    let pool = test_pool().await;
    let table = unique_name("stepsql_state");
    let store = PgStateStore::new(pool.clone(), &table).unwrap();

    store.ensure_table().await.unwrap();
    store.ensure_table().await.unwrap();

    let mut state = store.fetch_or_create("orders").await.unwrap();
    assert_eq!(state.applied_count, 0);

    let again = store.fetch_or_create("orders").await.unwrap();
    assert_eq!(again.applied_count, 0);

    state.applied_count = 1;
    assert_eq!(store.persist(&state, 0).await.unwrap(), PersistOutcome::Updated);

    // Stale expected count does not overwrite.
    state.applied_count = 5;
    assert_eq!(store.persist(&state, 0).await.unwrap(), PersistOutcome::NoRowMatched);
    assert_eq!(store.fetch_or_create("orders").await.unwrap().applied_count, 1);

    let rows: i64 = sqlx::query(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(&pool)
        .await
        .unwrap()
        .get(0);
    assert_eq!(rows, 1);

    drop_table(&pool, &table).await;
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_executor_runs_multi_statement_scripts() {
    let pool = test_pool().await;
    let table = unique_name("stepsql_exec");
    let executor = PgScriptExecutor::new(pool.clone());

    let script = format!(
        "CREATE TABLE {0} (id INT PRIMARY KEY);\nINSERT INTO {0} VALUES (1);\nINSERT INTO {0} VALUES (2);",
        table
    );
    executor.execute_script("1_multi.up.sql", &script).await.unwrap();

    let count: i64 = sqlx::query(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(&pool)
        .await
        .unwrap()
        .get(0);
    assert_eq!(count, 2);

    let err = executor
        .execute_script("2_broken.up.sql", "CREAT TABLE nope ();")
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::Execution { .. }));

    drop_table(&pool, &table).await;
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_runner_end_to_end() {
    let pool = test_pool().await;
    let state_table = unique_name("stepsql_state");
    let data_table = unique_name("stepsql_items");
    let temp_dir = TempDir::new().unwrap();

    fs::write(
        temp_dir.path().join("1_init.up.sql"),
        format!("CREATE TABLE {} (id INT);", data_table),
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("2_addcol.up.sql"),
        format!("ALTER TABLE {} ADD COLUMN name TEXT;", data_table),
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("3_seed.up.sql"),
        format!("INSERT INTO {} VALUES (1, 'a'), (2, 'b');", data_table),
    )
    .unwrap();

    let config = MigrationConfig {
        migrations_dir: temp_dir.path().to_path_buf(),
        migrations_table: state_table.clone(),
        tracked_database: "database_name".to_string(),
    };
    let store = Arc::new(PgStateStore::for_config(pool.clone(), &config).unwrap());
    store.ensure_table().await.unwrap();

    let make_runner = || {
        MigrationRunner::new(
            MigrationManager::with_config(config.clone()),
            Arc::clone(&store),
            PgScriptExecutor::new(pool.clone()),
        )
    };

    let first = make_runner().run_migrations().await.unwrap();
    assert_eq!(first.applied_count(), 3);
    assert_eq!(first.final_count, 3);

    let second = make_runner().run_migrations().await.unwrap();
    assert_eq!(second.applied_count(), 0);
    assert_eq!(second.skipped_count, 3);

    drop_table(&pool, &data_table).await;
    drop_table(&pool, &state_table).await;
}
