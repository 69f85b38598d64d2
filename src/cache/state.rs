use crate::element::{Element, FullData};
use serde::Serialize;
use std::collections::BTreeMap;

/// Result of a changed-since query: everything whose latest change-id is
/// in `(since, version]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangedSince {
    pub changed: BTreeMap<String, Vec<FullData>>,
    pub deleted: Vec<String>,
    pub version: u64,
}

#[derive(Debug, Clone)]
struct ChangeRecord {
    version: u64,
    collection_string: String,
    id: i64,
    deleted: bool,
}

/// In-memory versioned element store. Pure data structure; all locking and
/// validation lives in the surrounding `ElementCache` service.
#[derive(Debug, Default)]
pub struct CacheState {
    elements: BTreeMap<String, BTreeMap<i64, FullData>>,
    latest_change: BTreeMap<String, ChangeRecord>,
    version: u64,
}

impl CacheState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_version(&self) -> u64 {
        self.version
    }

    /// Apply a pre-validated batch under a single new version.
    pub fn apply(&mut self, elements: &[Element]) -> u64 {
        self.version += 1;
        for element in elements {
            let key = element.element_id();
            match &element.full_data {
                Some(full_data) => {
                    self.elements
                        .entry(element.collection_string.clone())
                        .or_default()
                        .insert(element.id, full_data.clone());
                }
                None => {
                    if let Some(collection) = self.elements.get_mut(&element.collection_string) {
                        collection.remove(&element.id);
                    }
                }
            }
            self.latest_change.insert(
                key,
                ChangeRecord {
                    version: self.version,
                    collection_string: element.collection_string.clone(),
                    id: element.id,
                    deleted: element.is_deleted(),
                },
            );
        }
        self.version
    }

    pub fn get(&self, collection_string: &str, id: i64) -> Option<&FullData> {
        self.elements.get(collection_string)?.get(&id)
    }

    pub fn get_all_full_data(&self) -> BTreeMap<String, Vec<FullData>> {
        self.elements
            .iter()
            .map(|(collection, by_id)| (collection.clone(), by_id.values().cloned().collect()))
            .collect()
    }

    /// Elements whose latest change-id is greater than `since`, split into
    /// changed full_data (grouped by collection) and deleted element_ids.
    pub fn get_changed_since(&self, since: u64) -> ChangedSince {
        let mut changed: BTreeMap<String, Vec<FullData>> = BTreeMap::new();
        let mut deleted = Vec::new();

        for (key, record) in &self.latest_change {
            if record.version <= since {
                continue;
            }
            if record.deleted {
                deleted.push(key.clone());
            } else if let Some(full_data) = self.get(&record.collection_string, record.id) {
                changed
                    .entry(record.collection_string.clone())
                    .or_default()
                    .push(full_data.clone());
            }
        }

        ChangedSince {
            changed,
            deleted,
            version: self.version,
        }
    }

}
