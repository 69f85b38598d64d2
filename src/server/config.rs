/**
 * Server Configuration
 *
 * This module handles loading and validation of server configuration,
 * focusing on the SQLite database backing the history log.
 *
 * # Configuration Sources
 *
 * Configuration is loaded from environment variables, with sensible
 * defaults for local development: without `DATABASE_URL` the server runs
 * against an in-memory database (history does not survive restarts).
 */

use crate::error::PlenumError;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Load the database pool and run migrations.
///
/// This function:
/// 1. Reads `DATABASE_URL` from the environment (in-memory fallback)
/// 2. Creates a SQLite connection pool
/// 3. Runs database migrations
///
/// # Errors
///
/// Connection or migration failures surface to the caller: the history
/// log is complete-or-absent and the server does not start without it.
pub async fn load_database() -> Result<SqlitePool, PlenumError> {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set. Using an in-memory database; history will not survive restarts."
            );
            IN_MEMORY_URL.to_string()
        }
    };

    tracing::info!("Connecting to database...");

    // An in-memory SQLite database exists per connection; more than one
    // connection would mean more than one database.
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");

    tracing::info!("Running database migrations...");
    sqlx::migrate!()
        .run(&pool)
        .await
        .map_err(|e| PlenumError::Database(sqlx::Error::Migrate(Box::new(e))))?;
    tracing::info!("Database migrations completed successfully");

    Ok(pool)
}
