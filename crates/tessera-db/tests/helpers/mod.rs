//! Shared fixtures for ledger tests against a real PostgreSQL.
//!
//! Each test gets its own container with the ledger migrations applied and a
//! minimal `users` table standing in for the host application's schema.

#![allow(dead_code)]

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tessera_core::models::{MediaCollection, MediaMetadata, NewMediaRecord, OwnerRef};
use tessera_core::StorageBackend;
use tessera_db::run_migrations;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

pub struct TestDb {
    pub pool: PgPool,
    _container: ContainerAsync<Postgres>,
}

/// Setup an isolated database with the ledger schema
pub async fn setup_test_db() -> TestDb {
    let container = Postgres::default()
        .start()
        .await
        .expect("Failed to start Postgres container");

    let host = container
        .get_host()
        .await
        .expect("Failed to get container host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get container port");

    let connection_string = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&connection_string)
        .await
        .expect("Failed to connect to test database");

    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    sqlx::query("CREATE TABLE users (id BIGINT PRIMARY KEY, avatar TEXT)")
        .execute(&pool)
        .await
        .expect("Failed to create users table");

    TestDb {
        pool,
        _container: container,
    }
}

pub fn new_record(
    owner: OwnerRef,
    collection: MediaCollection,
    path: &str,
    order: i32,
) -> NewMediaRecord {
    NewMediaRecord {
        owner,
        collection,
        storage_backend: StorageBackend::Local,
        path: path.to_string(),
        original_filename: "photo.jpg".to_string(),
        mime_type: "image/jpeg".to_string(),
        size_bytes: 1024,
        order,
        metadata: MediaMetadata::new(),
    }
}
