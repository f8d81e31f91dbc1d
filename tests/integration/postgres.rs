//! PostgreSQL backend tests against a live server
//!
//! Run with: cargo test --test integration postgres -- --ignored --test-threads=1

use database_operator::backend::sql::{DELETED_PREFIX, sanitize_identifier};
use database_operator::backend::{DatabaseBackend, PostgresBackend};
use tokio_postgres::NoTls;

use crate::{server_config, unique_name};

/// Admin connection for inspecting server state directly
async fn admin_client() -> tokio_postgres::Client {
    let server = server_config(false);
    let mut config = tokio_postgres::Config::new();
    config
        .host(&server.host)
        .port(server.port)
        .user(&server.user)
        .password(&server.password)
        .dbname("postgres");
    let (client, connection) = config.connect(NoTls).await.expect("admin connection");
    tokio::spawn(connection);
    client
}

async fn database_names_like(pattern: &str) -> Vec<String> {
    admin_client()
        .await
        .query(
            "SELECT datname FROM pg_database WHERE datname LIKE $1",
            &[&pattern],
        )
        .await
        .unwrap()
        .iter()
        .map(|row| row.get(0))
        .collect()
}

async fn drop_everything(database: &str, role: &str) {
    let admin = admin_client().await;
    for name in database_names_like(&format!("%{}", database)).await {
        admin
            .batch_execute(&format!("DROP DATABASE IF EXISTS \"{}\"", name))
            .await
            .unwrap();
    }
    admin
        .batch_execute(&format!("DROP ROLE IF EXISTS \"{}\"", role))
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL server"]
async fn test_create_is_idempotent() {
    let backend = PostgresBackend::new(server_config(false)).unwrap();
    let name = unique_name("orders");
    let user = sanitize_identifier(&unique_name("app"));

    backend.create(&name, &user, "p'w").await.unwrap();
    backend.create(&name, &user, "p'w").await.unwrap();

    assert!(backend.ping(&name, &user, "p'w").await);
    assert!(!backend.ping(&name, &user, "wrong").await);

    drop_everything(&sanitize_identifier(&name), &user).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL server"]
async fn test_delete_drops_database() {
    let backend = PostgresBackend::new(server_config(false)).unwrap();
    let name = unique_name("invoices");
    let user = sanitize_identifier(&unique_name("app"));

    backend.create(&name, &user, "pw").await.unwrap();
    backend.delete(&name).await.unwrap();
    backend.delete(&name).await.unwrap();

    assert!(!backend.ping(&name, &user, "pw").await);
    assert!(
        database_names_like(&sanitize_identifier(&name))
            .await
            .is_empty()
    );

    drop_everything(&sanitize_identifier(&name), &user).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL server"]
async fn test_production_delete_renames_database() {
    let backend = PostgresBackend::new(server_config(true)).unwrap();
    assert!(backend.is_production());
    let name = unique_name("ledger");
    let database = sanitize_identifier(&name);
    let user = sanitize_identifier(&unique_name("app"));

    backend.create(&name, &user, "pw").await.unwrap();
    backend.delete(&name).await.unwrap();

    assert!(database_names_like(&database).await.is_empty());
    let renamed = database_names_like(&format!("{}\\_%\\_{}", DELETED_PREFIX, database)).await;
    assert_eq!(renamed.len(), 1);

    // Nothing left to rename
    backend.delete(&name).await.unwrap();

    drop_everything(&database, &user).await;
}
