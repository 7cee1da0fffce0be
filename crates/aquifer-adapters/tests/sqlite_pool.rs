//! End-to-end tests: configuration -> registry -> pool -> pooled handle
//! against a real SQLite database file.

#![cfg(feature = "sqlite")]

use aquifer_adapters::{AdapterRegistry, ConfiguredFactory};
use aquifer_core::{AdapterConfig, Error, FieldSpec, FieldType, Migration, MigrationOutcome, Value};
use aquifer_pool::{PoolConfig, PoolRegistry};
use std::sync::Arc;
use tempfile::TempDir;

fn sqlite_config(dir: &TempDir, name: &str) -> AdapterConfig {
    let path = dir.path().join(format!("{name}.db"));
    AdapterConfig::new("sqlite", name).with_param("database", path.to_string_lossy().to_string())
}

async fn pooled_registry(dir: &TempDir, name: &str, config: PoolConfig) -> PoolRegistry {
    let adapters = AdapterRegistry::with_defaults();
    let factory = Arc::new(
        ConfiguredFactory::resolve(&adapters, sqlite_config(dir, name)).expect("factory"),
    );
    let pools = PoolRegistry::new();
    pools.get_or_create(name, config, factory).await;
    pools
}

fn thing_migration() -> Migration {
    Migration::new(
        "things",
        "Thing",
        "1.0",
        vec![
            FieldSpec::new("id", FieldType::Counter).primary(),
            FieldSpec::new("name", FieldType::Text).not_null(),
            FieldSpec::new("weight", FieldType::Number),
        ],
    )
    .description("Initial Thing table")
}

#[tokio::test]
async fn migrate_insert_and_query_through_a_pooled_handle() {
    let dir = TempDir::new().expect("tempdir");
    let pools = pooled_registry(&dir, "local", PoolConfig::new(4)).await;
    let mut handle = pools.handle("local").expect("handle");

    let outcome = handle.migrate(&thing_migration()).await.expect("migrate");
    assert_eq!(outcome, MigrationOutcome::Applied);
    let outcome = handle.migrate(&thing_migration()).await.expect("repeat");
    assert_eq!(outcome, MigrationOutcome::AlreadyApplied);

    handle
        .execute(
            "INSERT INTO things (name, weight) VALUES (?, ?)",
            &[Value::from("anvil"), Value::Float(12.5)],
        )
        .await
        .expect("insert");
    assert_eq!(handle.last_identity().await.expect("identity"), Value::Int(1));

    let rows = handle
        .query("SELECT name, weight FROM things WHERE id = ?", &[Value::Int(1)])
        .await
        .expect("select");
    assert_eq!(rows.value(0, "name"), Some(&Value::from("anvil")));
    assert_eq!(rows.value(0, "weight"), Some(&Value::Float(12.5)));
    handle.close();
}

#[tokio::test]
async fn identity_counter_and_views_through_the_handle() {
    let dir = TempDir::new().expect("tempdir");
    let pools = pooled_registry(&dir, "local", PoolConfig::new(2)).await;
    let mut handle = pools.handle("local").expect("handle");

    assert_eq!(handle.select_identity("Thing", "id").await.expect("first"), 1);
    assert_eq!(handle.select_identity("Thing", "id").await.expect("second"), 2);
    assert_eq!(handle.select_identity("Order", "id").await.expect("other"), 1);

    handle.migrate(&thing_migration()).await.expect("migrate");
    handle
        .execute("INSERT INTO things (name) VALUES ('brick')", &[])
        .await
        .expect("insert");
    handle
        .create_view("v_thing_names", "SELECT name FROM things")
        .await
        .expect("view");
    let rows = handle
        .query("SELECT name FROM v_thing_names", &[])
        .await
        .expect("select view");
    assert_eq!(rows.value(0, "name"), Some(&Value::from("brick")));
    handle.close();
}

#[tokio::test]
async fn transactions_commit_and_roll_back_through_the_handle() {
    let dir = TempDir::new().expect("tempdir");
    let pools = pooled_registry(&dir, "local", PoolConfig::new(2)).await;
    let mut handle = pools.handle("local").expect("handle");
    handle.migrate(&thing_migration()).await.expect("migrate");

    handle
        .execute_in_transaction(Box::new(|adapter| {
            Box::pin(async move {
                adapter
                    .execute("INSERT INTO things (name) VALUES ('a')", &[])
                    .await?;
                adapter
                    .execute("INSERT INTO things (name) VALUES ('b')", &[])
                    .await?;
                Ok(())
            })
        }))
        .await
        .expect("commit");

    let err = handle
        .execute_in_transaction(Box::new(|adapter| {
            Box::pin(async move {
                adapter
                    .execute("INSERT INTO things (name) VALUES ('c')", &[])
                    .await?;
                Err(Error::Other("abort".into()))
            })
        }))
        .await
        .expect_err("rollback");
    assert!(matches!(err, Error::Other(_)));

    let rows = handle
        .query("SELECT COUNT(*) AS cnt FROM things", &[])
        .await
        .expect("count");
    assert_eq!(rows.value(0, "cnt"), Some(&Value::Int(2)));
    handle.close();
}

#[tokio::test]
async fn handles_share_the_same_pooled_connection() {
    let dir = TempDir::new().expect("tempdir");
    let pools = pooled_registry(&dir, "local", PoolConfig::new(4)).await;

    let mut first = pools.handle("local").expect("first handle");
    first.migrate(&thing_migration()).await.expect("migrate");
    first
        .execute("INSERT INTO things (name) VALUES ('shared')", &[])
        .await
        .expect("insert");
    first.close();

    let pool = pools.get("local").expect("pool");
    assert_eq!(pool.stats().total, 1, "one connection serves every handle");

    let mut second = pools.handle("local").expect("second handle");
    let rows = second
        .query("SELECT name FROM things", &[])
        .await
        .expect("select");
    assert_eq!(rows.value(0, "name"), Some(&Value::from("shared")));
    second.close();
    assert_eq!(pool.stats().total, 1);
}

#[tokio::test]
async fn drained_pool_reconnects_to_the_same_database() {
    let dir = TempDir::new().expect("tempdir");
    let pools = pooled_registry(&dir, "local", PoolConfig::new(2)).await;

    let mut handle = pools.handle("local").expect("handle");
    handle.migrate(&thing_migration()).await.expect("migrate");
    handle
        .execute("INSERT INTO things (name) VALUES ('durable')", &[])
        .await
        .expect("insert");
    handle.close();

    pools.drain_all().await;
    let pool = pools.get("local").expect("pool");
    assert_eq!(pool.stats().total, 0, "idle connections closed");

    // A fresh connection to the same file still sees the data.
    let mut handle = pools.handle("local").expect("post-drain handle");
    let rows = handle
        .query("SELECT name FROM things", &[])
        .await
        .expect("select");
    assert_eq!(rows.value(0, "name"), Some(&Value::from("durable")));
    handle.close();
}
