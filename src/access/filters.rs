/**
 * Concrete Access Filters
 *
 * Reusable filter implementations for the built-in collections. Business
 * apps with richer rules implement `AccessFilter` themselves; these cover
 * the common cases:
 *
 * - `PublicFilter` - everyone sees full data
 * - `PermissionFilter` - full data gated on one permission
 * - `FieldStripFilter` - full data for holders of a manage permission,
 *   a reduced view (named fields removed) for everyone else
 */

use super::{AccessFilter, Identity, RedactionResult};
use crate::element::FullData;

/// Everyone sees full data, including anonymous identities.
pub struct PublicFilter;

impl AccessFilter for PublicFilter {
    fn restrict(&self, full_data: &FullData, _identity: &Identity) -> RedactionResult {
        RedactionResult::Full(full_data.clone())
    }
}

/// Full data for identities holding one permission, hidden otherwise.
pub struct PermissionFilter {
    permission: String,
}

impl PermissionFilter {
    pub fn new(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
        }
    }
}

impl AccessFilter for PermissionFilter {
    fn restrict(&self, full_data: &FullData, identity: &Identity) -> RedactionResult {
        if identity.has_permission(&self.permission) {
            RedactionResult::Full(full_data.clone())
        } else {
            RedactionResult::Hidden
        }
    }
}

/// Full data for holders of a manage permission; a partial view with the
/// named fields stripped for everyone else.
///
/// Used for collections that are broadly visible but carry a few
/// management-only fields (e.g. config entries whose values embed keys or
/// internal URLs).
pub struct FieldStripFilter {
    manage_permission: String,
    stripped_fields: Vec<String>,
}

impl FieldStripFilter {
    pub fn new(
        manage_permission: impl Into<String>,
        stripped_fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            manage_permission: manage_permission.into(),
            stripped_fields: stripped_fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl AccessFilter for FieldStripFilter {
    fn restrict(&self, full_data: &FullData, identity: &Identity) -> RedactionResult {
        if identity.has_permission(&self.manage_permission) {
            return RedactionResult::Full(full_data.clone());
        }
        let mut reduced = full_data.clone();
        for field in &self.stripped_fields {
            reduced.remove(field);
        }
        RedactionResult::Partial(reduced)
    }
}
