/**
 * Element Cache Service
 *
 * Process-wide versioned cache mirroring authoritative storage. All
 * mutation funnels through `update`, the single serialization point;
 * reads run fully in parallel against a consistent snapshot.
 *
 * # Versioning
 *
 * Every committed batch is assigned exactly one new global change-id.
 * `update` is linearizable with respect to the read operations: a reader
 * observing version N sees all writes committed at or before N and none
 * after.
 *
 * # Commit Hooks
 *
 * Observers (the change notifier, metrics, ...) register as `CommitHook`s
 * at construction time. Hooks fire exactly once per successful visible
 * update, in commit order, while the writer still holds the commit lock -
 * so they must only enqueue work, never perform I/O or block.
 *
 * # Visible vs. Bookkeeping Writes
 *
 * Internal bookkeeping (history writes, vote tallying) must not trigger a
 * second round of notifications. `UpdateKind::Bookkeeping` applies the
 * batch without firing hooks; `UpdateKind::Visible` is the normal path.
 */

use crate::access::FilterRegistry;
use crate::cache::state::{CacheState, ChangedSince};
use crate::element::{Element, FullData};
use crate::error::PlenumError;
use crate::access::Identity;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Distinguishes ordinary mutations from internal bookkeeping writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Normal mutation: commit hooks fire, subscribers are notified.
    Visible,
    /// Internal write: stored and versioned, but hooks are skipped.
    Bookkeeping,
}

/// Observer invoked once per committed visible batch.
///
/// Implementations must be non-blocking; they run inside the writer's
/// critical section and should only enqueue work.
pub trait CommitHook: Send + Sync {
    fn on_commit(&self, version: u64, elements: &[Element]);
}

/// The process-wide element cache.
///
/// Constructed once at startup with the filter registry (used for update
/// validation and read-path redaction) and the list of commit hooks.
pub struct ElementCache {
    state: RwLock<CacheState>,
    registry: Arc<FilterRegistry>,
    hooks: Vec<Arc<dyn CommitHook>>,
}

impl ElementCache {
    pub fn new(registry: Arc<FilterRegistry>) -> Self {
        Self {
            state: RwLock::new(CacheState::new()),
            registry,
            hooks: Vec::new(),
        }
    }

    /// Register a commit hook. Only possible before the cache is shared.
    pub fn add_hook(&mut self, hook: Arc<dyn CommitHook>) {
        self.hooks.push(hook);
    }

    /// The filter registry this cache validates and redacts against.
    pub fn registry(&self) -> &Arc<FilterRegistry> {
        &self.registry
    }

    /// Atomically apply a batch of element changes under one new version.
    ///
    /// All-or-nothing: if any element fails validation the whole batch is
    /// rejected and the global version is unchanged. An empty batch is a
    /// no-op and returns the current version without bumping it.
    ///
    /// # Errors
    ///
    /// `PlenumError::Validation` if an element's collection is not
    /// registered, or its full_data is missing a matching "id" field.
    pub async fn update(
        &self,
        elements: Vec<Element>,
        kind: UpdateKind,
    ) -> Result<u64, PlenumError> {
        self.validate(&elements)?;

        let mut state = self.state.write().await;
        if elements.is_empty() {
            return Ok(state.current_version());
        }
        let version = state.apply(&elements);

        // Hooks fire under the commit lock so per-session delivery queues
        // observe versions in commit order. Hooks only enqueue.
        if kind == UpdateKind::Visible {
            for hook in &self.hooks {
                hook.on_commit(version, &elements);
            }
        }
        drop(state);

        tracing::debug!(
            version = version,
            elements = elements.len(),
            visible = kind == UpdateKind::Visible,
            "[Cache] Batch committed"
        );
        Ok(version)
    }

    fn validate(&self, elements: &[Element]) -> Result<(), PlenumError> {
        for element in elements {
            if !self.registry.is_registered(&element.collection_string) {
                return Err(PlenumError::validation(
                    element.element_id(),
                    format!("unknown collection '{}'", element.collection_string),
                ));
            }
            if let Some(full_data) = &element.full_data {
                match full_data.get("id").and_then(|v| v.as_i64()) {
                    Some(id) if id == element.id => {}
                    Some(id) => {
                        return Err(PlenumError::validation(
                            element.element_id(),
                            format!("full_data id {} does not match element id", id),
                        ));
                    }
                    None => {
                        return Err(PlenumError::validation(
                            element.element_id(),
                            "full_data is missing an integer 'id' field",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Complete current state, grouped by collection. Used for cold start,
    /// history seeding and initial client sync.
    pub async fn get_all_full_data(&self) -> BTreeMap<String, Vec<FullData>> {
        self.state.read().await.get_all_full_data()
    }

    /// Changes with a change-id in `(since, current]`, plus deletions.
    pub async fn get_changed_since(&self, since: u64) -> ChangedSince {
        self.state.read().await.get_changed_since(since)
    }

    pub async fn get_current_version(&self) -> u64 {
        self.state.read().await.current_version()
    }

    /// One element's current full data, unredacted.
    pub async fn get(&self, collection_string: &str, id: i64) -> Option<FullData> {
        self.state.read().await.get(collection_string, id).cloned()
    }

    /// Complete current state reduced to what `identity` may see.
    ///
    /// Hidden elements are dropped; collections with nothing visible are
    /// omitted entirely.
    pub async fn get_all_restricted(&self, identity: &Identity) -> BTreeMap<String, Vec<FullData>> {
        let all = self.state.read().await.get_all_full_data();
        let mut restricted: BTreeMap<String, Vec<FullData>> = BTreeMap::new();
        for (collection, entries) in all {
            let visible: Vec<FullData> = entries
                .iter()
                .filter_map(|full_data| {
                    self.registry
                        .restrict(&collection, full_data, identity)
                        .into_data()
                })
                .collect();
            if !visible.is_empty() {
                restricted.insert(collection, visible);
            }
        }
        restricted
    }

    /// Changed-since view reduced to what `identity` may see.
    ///
    /// Deleted element ids are passed through unredacted: an id leak is
    /// preferable to a subscriber retaining an element it can no longer
    /// verify, and matches the original wire contract.
    pub async fn get_changed_since_restricted(
        &self,
        identity: &Identity,
        since: u64,
    ) -> ChangedSince {
        let raw = self.state.read().await.get_changed_since(since);
        let mut changed: BTreeMap<String, Vec<FullData>> = BTreeMap::new();
        for (collection, entries) in raw.changed {
            let visible: Vec<FullData> = entries
                .iter()
                .filter_map(|full_data| {
                    self.registry
                        .restrict(&collection, full_data, identity)
                        .into_data()
                })
                .collect();
            if !visible.is_empty() {
                changed.insert(collection, visible);
            }
        }
        ChangedSince {
            changed,
            deleted: raw.deleted,
            version: raw.version,
        }
    }
}
