//! Database test fixtures and utilities
//!
//! Provides utilities for setting up test databases and running
//! migrations.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Create an isolated in-memory test database with migrations applied.
///
/// Capped at one connection: each in-memory SQLite connection is its own
/// database, so a larger pool would split the schema across databases.
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}
