/**
 * REST Route Handlers
 *
 * This module defines the JSON request handlers for the element and
 * history endpoints.
 *
 * # Identity
 *
 * Authentication is an external collaborator. Requests arrive with the
 * trusted headers `x-user-id`, `x-permissions` (comma-separated) and
 * `x-superuser` already resolved by the auth layer in front of this
 * server; a request without them is anonymous.
 *
 * # Routes
 *
 * - `GET /elements` - full sync, access-filtered
 * - `GET /elements/changed?since=N` - incremental catch-up
 * - `POST /elements` - apply an update batch
 * - `GET /history` - full audit trail
 * - `GET /history/{*element_id}` - one element's audit trail
 * - `GET /version` - current change-id
 */

use crate::access::Identity;
use crate::cache::{ChangedSince, ElementCache, UpdateKind};
use crate::element::{Element, FullData};
use crate::error::PlenumError;
use crate::history::{HistoryEntry, HistoryLog};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Resolve the request identity from the trusted auth headers.
///
/// Malformed header values degrade to their anonymous defaults rather
/// than failing the request; the auth layer in front of this server is
/// the place that rejects forged input.
pub fn identity_from_headers(headers: &HeaderMap) -> Identity {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok());

    let superuser = headers
        .get("x-superuser")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let mut identity = if superuser {
        Identity::superuser()
    } else {
        Identity::anonymous()
    };
    identity.user_id = user_id;

    if let Some(permissions) = headers.get("x-permissions").and_then(|v| v.to_str().ok()) {
        for permission in permissions.split(',') {
            let permission = permission.trim();
            if !permission.is_empty() {
                identity = identity.with_permission(permission);
            }
        }
    }
    identity
}

/// Response body of `GET /elements`.
#[derive(Debug, Serialize)]
pub struct FullSyncResponse {
    pub elements: BTreeMap<String, Vec<FullData>>,
    pub version: u64,
}

/// Response body of `POST /elements` and `GET /version`.
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: u64,
}

#[derive(Debug, Deserialize)]
pub struct SinceQuery {
    #[serde(default)]
    pub since: u64,
}

/// Handle full element sync (GET /elements)
///
/// Returns the complete current state reduced to what the requesting
/// identity may see, together with the version the snapshot corresponds
/// to. The version is read before the elements, so a concurrent write
/// at worst makes the reported version conservative, never ahead of the
/// data.
pub async fn handle_get_elements(
    State(cache): State<Arc<ElementCache>>,
    headers: HeaderMap,
) -> Json<FullSyncResponse> {
    let identity = identity_from_headers(&headers);
    let version = cache.get_current_version().await;
    let elements = cache.get_all_restricted(&identity).await;
    Json(FullSyncResponse { elements, version })
}

/// Handle incremental catch-up (GET /elements/changed?since=N)
///
/// Returns every element changed after version `since`, access-filtered,
/// plus the ids of elements deleted in that window. `since=0` (the
/// default) is equivalent to a full sync in changed-since shape.
pub async fn handle_get_changed(
    State(cache): State<Arc<ElementCache>>,
    headers: HeaderMap,
    Query(query): Query<SinceQuery>,
) -> Json<ChangedSince> {
    let identity = identity_from_headers(&headers);
    let changed = cache
        .get_changed_since_restricted(&identity, query.since)
        .await;
    Json(changed)
}

/// Handle an element update batch (POST /elements)
///
/// Applies the batch atomically under one new version and returns it.
/// Validation failure rejects the whole batch with 400; nothing is
/// partially applied.
pub async fn handle_post_elements(
    State(cache): State<Arc<ElementCache>>,
    Json(elements): Json<Vec<Element>>,
) -> Result<Json<VersionResponse>, PlenumError> {
    let version = cache.update(elements, UpdateKind::Visible).await?;
    Ok(Json(VersionResponse { version }))
}

/// Handle current version query (GET /version)
pub async fn handle_get_version(
    State(cache): State<Arc<ElementCache>>,
) -> Json<VersionResponse> {
    let version = cache.get_current_version().await;
    Json(VersionResponse { version })
}

/// Handle full history read (GET /history)
///
/// # Errors
///
/// * `403 Forbidden` - identity lacks `core.can_see_history`
pub async fn handle_get_history(
    State(history): State<Arc<HistoryLog>>,
    headers: HeaderMap,
) -> Result<Json<Vec<HistoryEntry>>, PlenumError> {
    let identity = identity_from_headers(&headers);
    let entries = history.entries(&identity).await?;
    Ok(Json(entries))
}

/// Handle per-element history read (GET /history/{*element_id})
///
/// The element id contains a slash ("core/tag:1"), hence the wildcard
/// path segment.
pub async fn handle_get_element_history(
    State(history): State<Arc<HistoryLog>>,
    headers: HeaderMap,
    Path(element_id): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, PlenumError> {
    let identity = identity_from_headers(&headers);
    let entries = history.entries_for_element(&identity, &element_id).await?;
    Ok(Json(entries))
}
