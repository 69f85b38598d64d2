/**
 * Router Configuration
 *
 * This module provides the main router creation function that combines
 * all route configurations into a single Axum router.
 *
 * # Route Order
 *
 * Routes are added in a specific order:
 * 1. Element routes (sync, catch-up, updates)
 * 2. Autoupdate subscription (SSE)
 * 3. History routes (audit read path)
 * 4. Version endpoint
 * 5. Fallback handler (404)
 */

use crate::routes::autoupdate::handle_autoupdate;
use crate::routes::handlers::{
    handle_get_changed, handle_get_element_history, handle_get_elements, handle_get_history,
    handle_get_version, handle_post_elements,
};
use crate::server::state::AppState;
use axum::routing::get;
use axum::Router;

/// Create the Axum router with all routes configured
///
/// # Arguments
///
/// * `app_state` - Application state containing cache, notifier and history
///
/// # Returns
///
/// Configured Axum Router ready to serve requests
///
/// # Route Details
///
/// - `GET /elements` - Full sync, access-filtered per identity
/// - `GET /elements/changed?since=N` - Incremental catch-up
/// - `POST /elements` - Apply an update batch, returns the new version
/// - `GET /autoupdate?since=N` - SSE stream of live deltas
/// - `GET /history` - Full audit trail (requires `core.can_see_history`)
/// - `GET /history/{*element_id}` - One element's audit trail
/// - `GET /version` - Current change-id
pub fn create_router(app_state: AppState) -> Router<()> {
    Router::new()
        .route(
            "/elements",
            get(handle_get_elements).post(handle_post_elements),
        )
        .route("/elements/changed", get(handle_get_changed))
        .route("/autoupdate", get(handle_autoupdate))
        .route("/history", get(handle_get_history))
        // Element ids contain a slash ("core/tag:1"), hence the wildcard.
        .route("/history/{*element_id}", get(handle_get_element_history))
        .route("/version", get(handle_get_version))
        .fallback(|| async { "404 Not Found" })
        .with_state(app_state)
}
