/**
 * Server Initialization
 *
 * This module handles the initialization and setup of the Axum HTTP
 * server: filter registry, cache, notifier, history log and background
 * tasks, wired together in dependency order.
 *
 * # Initialization Process
 *
 * 1. Build the filter registry (one filter per collection, fixed for the
 *    process lifetime)
 * 2. Connect the database and run migrations
 * 3. Construct notifier and history hook, register both on the cache
 * 4. Seed the history table if empty
 * 5. Spawn the history writer and the stale-session sweeper
 * 6. Create the router
 */

use crate::access::FilterRegistry;
use crate::cache::ElementCache;
use crate::error::PlenumError;
use crate::history::{history_channel, HistoryLog};
use crate::models::register_builtin_collections;
use crate::notify::ChangeNotifier;
use crate::routes::create_router;
use crate::server::config::load_database;
use crate::server::state::AppState;
use axum::Router;
use std::sync::Arc;

/// How often stale subscriber sessions are dropped.
const SWEEP_INTERVAL_SECS: u64 = 300;

/// Create and configure the Axum application.
///
/// # Errors
///
/// Fails if the database cannot be connected or migrated, or if seeding
/// the history from the cache fails.
pub async fn create_app() -> Result<Router<()>, PlenumError> {
    tracing::info!("Initializing plenum server");

    // Step 1: Filter registry, resolved once at startup
    let mut registry = FilterRegistry::new();
    register_builtin_collections(&mut registry);
    let registry = Arc::new(registry);

    // Step 2: Database for the history log
    let pool = load_database().await?;
    let history = Arc::new(HistoryLog::new(pool));

    // Step 3: Cache with its commit hooks. The notifier fans out to
    // sessions; the history hook enqueues for the background writer.
    let notifier = Arc::new(ChangeNotifier::new(registry.clone()));
    let (history_hook, mut history_rx) = history_channel();

    let mut cache = ElementCache::new(registry);
    cache.add_hook(notifier.clone());
    cache.add_hook(Arc::new(history_hook));
    let cache = Arc::new(cache);

    tracing::info!("Cache, notifier and history log initialized");

    // Step 4: Seed the history if the table is empty
    history.build_history(&cache).await?;

    // Step 5a: History writer, out of the commit hot path
    let history_writer = history.clone();
    tokio::spawn(async move {
        while let Some(batch) = history_rx.recv().await {
            if let Err(e) = history_writer.add_elements(&batch).await {
                tracing::error!("[History] Failed to append batch: {:?}", e);
            }
        }
    });

    // Step 5b: Periodic sweep of stale subscriber sessions
    let sweeper = notifier.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            sweeper.sweep_stale();
        }
    });

    // Step 6: Router with all routes
    let app_state = AppState {
        cache,
        notifier,
        history,
    };
    tracing::info!("Router configured");
    Ok(create_router(app_state))
}
