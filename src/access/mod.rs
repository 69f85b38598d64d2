/**
 * Access Filter Framework
 *
 * This module centralizes redaction at the cache boundary. Every delivery
 * channel (initial sync, live push, catch-up) runs elements through the
 * same per-collection filter, so "what the store returns" and "what the
 * user may see" cannot drift apart.
 *
 * # Registry
 *
 * Each collection registers exactly one filter at startup. Lookups for
 * unregistered collections return `Hidden` for every non-superuser
 * identity (deny-by-default). Superusers always see `Full` data.
 *
 * # Purity
 *
 * `restrict` is deterministic and side-effect-free for a fixed
 * (element, identity, permission-state) triple. Filters receive the
 * element's full data by reference and must never mutate the cache.
 */

pub mod filters;

use crate::element::FullData;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// The requesting identity, as established by the (external) auth layer.
///
/// The core treats this as plain data: a user id, a superuser flag and a
/// set of granted permissions. How these are established (sessions, JWTs,
/// group membership expansion) is the collaborator's job.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    /// User id, `None` for anonymous requesters.
    pub user_id: Option<i64>,
    /// Superusers bypass all filters and always receive full data.
    pub superuser: bool,
    /// Granted permissions (e.g. "core.can_see_projector").
    pub permissions: HashSet<String>,
}

impl Identity {
    /// An anonymous identity with no permissions.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A regular user identity.
    pub fn user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// The superuser identity.
    pub fn superuser() -> Self {
        Self {
            superuser: true,
            ..Self::default()
        }
    }

    /// Grant a permission (builder style).
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    /// Whether this identity holds the given permission.
    ///
    /// Superusers implicitly hold every permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.superuser || self.permissions.contains(permission)
    }
}

/// Result of redacting one element for one identity.
#[derive(Debug, Clone, PartialEq)]
pub enum RedactionResult {
    /// The identity may see the element unchanged.
    Full(FullData),
    /// The identity may see a reduced view of the element.
    Partial(FullData),
    /// The element is suppressed entirely for this identity.
    Hidden,
}

impl RedactionResult {
    /// The visible data, if any.
    pub fn into_data(self) -> Option<FullData> {
        match self {
            Self::Full(data) | Self::Partial(data) => Some(data),
            Self::Hidden => None,
        }
    }

    /// Whether the element is visible at all.
    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::Hidden)
    }
}

/// Per-collection redaction predicate.
///
/// Implementations must be pure: same data, same identity, same result.
pub trait AccessFilter: Send + Sync {
    /// Reduce `full_data` to what `identity` may see, or hide it.
    fn restrict(&self, full_data: &FullData, identity: &Identity) -> RedactionResult;
}

/// Registry mapping collection names to their access filters.
///
/// Built once at startup and shared (via `Arc`) between the cache service,
/// the notifier and the server handlers. Registration after startup is not
/// supported; the set of collections is fixed for the process lifetime.
pub struct FilterRegistry {
    filters: HashMap<String, Arc<dyn AccessFilter>>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// Register the filter for a collection.
    ///
    /// Each collection registers exactly one filter; a second registration
    /// for the same collection replaces the first.
    pub fn register(
        &mut self,
        collection_string: impl Into<String>,
        filter: Arc<dyn AccessFilter>,
    ) -> &mut Self {
        self.filters.insert(collection_string.into(), filter);
        self
    }

    /// Whether a collection has a registered filter.
    ///
    /// The cache uses this for update validation: elements of unregistered
    /// collections are rejected wholesale.
    pub fn is_registered(&self, collection_string: &str) -> bool {
        self.filters.contains_key(collection_string)
    }

    /// Registered collection names.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(|k| k.as_str())
    }

    /// Redact one element's full data for an identity.
    ///
    /// Superusers always see `Full`; unregistered collections are `Hidden`
    /// for everyone else.
    pub fn restrict(
        &self,
        collection_string: &str,
        full_data: &FullData,
        identity: &Identity,
    ) -> RedactionResult {
        if identity.superuser {
            return RedactionResult::Full(full_data.clone());
        }
        match self.filters.get(collection_string) {
            Some(filter) => filter.restrict(full_data, identity),
            None => RedactionResult::Hidden,
        }
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
