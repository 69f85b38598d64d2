//! Cache Element
//!
//! This module defines the `Element` data unit: one versioned snapshot of
//! one entity, keyed by collection and id. Elements are what the business
//! layer hands to the cache and what the notifier fans out to subscribers.
//!
//! # Element Ids
//!
//! Every element has a derived `element_id` of the form
//! `"<collection>:<id>"` (e.g. `"core/tag:1"`), globally unique and used as
//! the cache's primary index.

use serde::{Deserialize, Serialize};

/// Complete wire representation of one entity: field name -> JSON value.
pub type FullData = serde_json::Map<String, serde_json::Value>;

/// Build the globally unique element id for a collection/id pair.
///
/// # Example
///
/// ```rust
/// use plenum::element::element_id;
///
/// assert_eq!(element_id("core/tag", 1), "core/tag:1");
/// ```
pub fn element_id(collection_string: &str, id: i64) -> String {
    format!("{}:{}", collection_string, id)
}

/// One versioned snapshot of one entity.
///
/// `full_data` of `None` means the entity was deleted. The remaining fields
/// are metadata consumed by the history log: `information` describes what
/// happened ("object created", ...), `user_id` is the acting user, and
/// `disable_history` excludes the element from the audit trail (internal
/// bookkeeping writes).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Element {
    /// Stable textual identifier of the entity type (e.g. "motions/motion").
    pub collection_string: String,
    /// Integer identifier, unique within the collection.
    pub id: i64,
    /// Complete current representation, or `None` for a deletion.
    pub full_data: Option<FullData>,
    /// Human-readable description of the change, for the history log.
    #[serde(default)]
    pub information: Vec<String>,
    /// Acting user, if any.
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Skip the history log for this element.
    #[serde(default)]
    pub disable_history: bool,
    /// Marks the history entry as restricted (interpreted by the caller).
    #[serde(default)]
    pub restricted: bool,
}

impl Element {
    /// Create an element carrying new full data.
    pub fn new(collection_string: impl Into<String>, id: i64, full_data: FullData) -> Self {
        Self {
            collection_string: collection_string.into(),
            id,
            full_data: Some(full_data),
            information: Vec::new(),
            user_id: None,
            disable_history: false,
            restricted: false,
        }
    }

    /// Create a deletion marker for an entity.
    pub fn deleted(collection_string: impl Into<String>, id: i64) -> Self {
        Self {
            collection_string: collection_string.into(),
            id,
            full_data: None,
            information: Vec::new(),
            user_id: None,
            disable_history: false,
            restricted: false,
        }
    }

    /// Attach change information (shown in the history log).
    pub fn with_information(mut self, information: impl Into<String>) -> Self {
        self.information.push(information.into());
        self
    }

    /// Attach the acting user.
    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// The globally unique cache key for this element.
    pub fn element_id(&self) -> String {
        element_id(&self.collection_string, self.id)
    }

    /// Whether this element is a deletion marker.
    pub fn is_deleted(&self) -> bool {
        self.full_data.is_none()
    }
}
