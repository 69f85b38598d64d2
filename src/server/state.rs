/**
 * Application State Management
 *
 * This module defines the application state structure and implements the
 * necessary `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * The `AppState` struct is the central state container, holding the
 * three core services wired together at startup:
 * - The element cache (single write path, versioned reads)
 * - The change notifier (per-session fan-out)
 * - The history log (durable audit trail)
 *
 * # Thread Safety
 *
 * All services are shared behind `Arc` and internally synchronized; the
 * state can be cloned freely into handlers and background tasks.
 */

use crate::cache::ElementCache;
use crate::history::HistoryLog;
use crate::notify::ChangeNotifier;
use axum::extract::FromRef;
use std::sync::Arc;

/// Application state that holds the cache, notifier and history services.
#[derive(Clone)]
pub struct AppState {
    /// The process-wide element cache; all mutation funnels through it.
    pub cache: Arc<ElementCache>,
    /// Fan-out of access-filtered deltas to subscriber sessions.
    pub notifier: Arc<ChangeNotifier>,
    /// Durable append-only change history.
    pub history: Arc<HistoryLog>,
}

impl FromRef<AppState> for Arc<ElementCache> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.cache.clone()
    }
}

impl FromRef<AppState> for Arc<ChangeNotifier> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.notifier.clone()
    }
}

impl FromRef<AppState> for Arc<HistoryLog> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.history.clone()
    }
}
