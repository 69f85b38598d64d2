/**
 * Error Types
 *
 * This module defines the error taxonomy for the cache and distribution
 * core. Each variant maps to an HTTP status code for the server surface.
 *
 * # Error Categories
 *
 * ## Validation Errors
 *
 * Malformed or disallowed input to `ElementCache::update`:
 * - Unknown (unregistered) collection
 * - Malformed full_data (missing or mismatched "id" field)
 *
 * A validation failure rejects the whole batch; nothing is partially
 * applied.
 *
 * ## Concurrency Conflicts
 *
 * Reserved for backing stores with optimistic concurrency. The in-process
 * store serializes all writes through one lock and never produces this
 * variant; a transactional backend would resolve it by retrying the whole
 * batch.
 *
 * ## Delivery Failures
 *
 * A subscriber session unreachable during fan-out. These are contained at
 * the notifier (the session is marked stale) and never propagate to the
 * writer; the variant exists for the notifier's internal bookkeeping and
 * logging.
 *
 * ## History Errors
 *
 * History is complete-or-absent: storage failures in `add_elements` or
 * `build_history` surface to the caller. A concurrent `build_history` is a
 * safe no-op, not an error.
 */

use axum::http::StatusCode;
use thiserror::Error;

/// All errors produced by the cache and distribution core.
#[derive(Debug, Error)]
pub enum PlenumError {
    /// Malformed or disallowed input to an update batch.
    ///
    /// The whole batch is rejected; the global version is unchanged.
    #[error("Validation error for '{element_id}': {message}")]
    Validation {
        /// Element id (or collection string) that failed validation
        element_id: String,
        /// Human-readable error message
        message: String,
    },

    /// Optimistic concurrency conflict in the backing store.
    ///
    /// Resolved by retrying the whole batch against the latest version,
    /// never by a partial merge.
    #[error("Concurrency conflict at version {version}, retry the batch")]
    ConcurrencyConflict {
        /// Version the batch was attempted against
        version: u64,
    },

    /// A subscriber session was unreachable during fan-out.
    #[error("Delivery to session {session_id} failed: {reason}")]
    Delivery {
        /// Session that could not be reached
        session_id: uuid::Uuid,
        /// Why delivery failed (queue full, receiver dropped, ...)
        reason: String,
    },

    /// The caller lacks the permission gating an endpoint.
    #[error("Permission denied: {permission} required")]
    PermissionDenied {
        /// The missing permission
        permission: String,
    },

    /// Database error from the history store.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PlenumError {
    /// Create a new validation error.
    pub fn validation(element_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            element_id: element_id.into(),
            message: message.into(),
        }
    }

    /// Create a new permission-denied error.
    pub fn permission_denied(permission: impl Into<String>) -> Self {
        Self::PermissionDenied {
            permission: permission.into(),
        }
    }

    /// Get the HTTP status code for this error.
    ///
    /// # Status Code Mapping
    ///
    /// - `Validation` - 400 Bad Request
    /// - `ConcurrencyConflict` - 409 Conflict
    /// - `Delivery` - 502 Bad Gateway (never actually surfaced to writers)
    /// - `PermissionDenied` - 403 Forbidden
    /// - `Database` / `Serialization` - 500 Internal Server Error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::ConcurrencyConflict { .. } => StatusCode::CONFLICT,
            Self::Delivery { .. } => StatusCode::BAD_GATEWAY,
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for PlenumError {
    /// Convert an error into a JSON HTTP response.
    ///
    /// # Response Format
    ///
    /// ```json
    /// {
    ///   "error": "Error message",
    ///   "status": 400
    /// }
    /// ```
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        (status, axum::Json(body)).into_response()
    }
}
