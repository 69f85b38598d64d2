/**
 * History Log
 *
 * Durable append-only record of every element change, independent of the
 * live cache. Entries reference immutable full-data snapshots and are
 * never updated; the only deletion path is a full purge.
 *
 * # Relationship to the Cache
 *
 * History writes happen out of the cache's hot path: the commit hook only
 * enqueues elements, and a background task drains the queue into
 * `add_elements`. The history collection itself is exempt from both the
 * live cache and the access filter; visibility is gated by the single
 * coarse `core.can_see_history` permission checked on the read path.
 *
 * # Build Guard
 *
 * `build_history` bulk-seeds an empty history table from the full cache.
 * It holds an async mutex for its whole run and re-checks emptiness under
 * the lock, so a second concurrent invocation is a safe no-op and can
 * never duplicate entries.
 */

use crate::access::Identity;
use crate::cache::ElementCache;
use crate::element::Element;
use crate::error::PlenumError;
use crate::history::db::{self, HistoryEntry};
use crate::cache::CommitHook;
use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::{mpsc, Mutex};

/// Collection string of history entries themselves. Elements of this
/// collection are never written to the history (no history of the
/// history).
pub const HISTORY_COLLECTION: &str = "core/history";

/// The coarse permission gating all history reads.
pub const CAN_SEE_HISTORY: &str = "core.can_see_history";

pub struct HistoryLog {
    pool: SqlitePool,
    build_lock: Mutex<()>,
}

impl HistoryLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            build_lock: Mutex::new(()),
        }
    }

    /// Persist one history entry per eligible element, all in one durable
    /// transaction sharing one timestamp.
    ///
    /// Elements flagged `disable_history` and elements of the history
    /// collection itself are skipped.
    ///
    /// # Errors
    ///
    /// Any storage failure rolls the whole batch back; history is meant to
    /// be complete-or-absent, never partial.
    pub async fn add_elements(&self, elements: &[Element]) -> Result<Vec<HistoryEntry>, PlenumError> {
        let mut tx = self.pool.begin().await?;
        let timestamp = Utc::now();
        let mut entries = Vec::new();
        for element in elements {
            if element.disable_history || element.collection_string == HISTORY_COLLECTION {
                continue;
            }
            let snapshot_id = db::insert_snapshot(&mut tx, &element.full_data).await?;
            let entry = db::insert_entry(&mut tx, element, timestamp, snapshot_id).await?;
            entries.push(entry);
        }
        tx.commit().await?;
        tracing::debug!(entries = entries.len(), "[History] Batch appended");
        Ok(entries)
    }

    /// One-time bulk seed: replay the entire current cache into the
    /// history. Only runs when the history table is empty; a concurrent or
    /// repeated invocation returns an empty vector without writing.
    pub async fn build_history(
        &self,
        cache: &ElementCache,
    ) -> Result<Vec<HistoryEntry>, PlenumError> {
        let _guard = self.build_lock.lock().await;
        if db::count_entries(&self.pool).await? > 0 {
            tracing::debug!("[History] Not empty, build skipped");
            return Ok(Vec::new());
        }

        let all_full_data = cache.get_all_full_data().await;
        let mut elements = Vec::new();
        for (collection_string, full_datas) in all_full_data {
            for full_data in full_datas {
                let Some(id) = full_data.get("id").and_then(|v| v.as_i64()) else {
                    tracing::warn!(collection = %collection_string, "[History] Skipping element without id");
                    continue;
                };
                elements.push(Element::new(collection_string.clone(), id, full_data));
            }
        }
        tracing::info!(elements = elements.len(), "[History] Building history from cache");
        self.add_elements(&elements).await
    }

    /// All history entries, oldest first, gated by `core.can_see_history`.
    pub async fn entries(&self, identity: &Identity) -> Result<Vec<HistoryEntry>, PlenumError> {
        self.check_permission(identity)?;
        db::load_entries(&self.pool, None).await
    }

    /// One element's append-only entry sequence, oldest first.
    pub async fn entries_for_element(
        &self,
        identity: &Identity,
        element_id: &str,
    ) -> Result<Vec<HistoryEntry>, PlenumError> {
        self.check_permission(identity)?;
        db::load_entries(&self.pool, Some(element_id)).await
    }

    /// Full history purge. Returns the number of entries removed.
    pub async fn clear(&self) -> Result<u64, PlenumError> {
        let deleted = db::clear(&self.pool).await?;
        tracing::info!(deleted, "[History] Purged");
        Ok(deleted)
    }

    fn check_permission(&self, identity: &Identity) -> Result<(), PlenumError> {
        if identity.has_permission(CAN_SEE_HISTORY) {
            Ok(())
        } else {
            Err(PlenumError::permission_denied(CAN_SEE_HISTORY))
        }
    }
}

/// Commit hook bridging the cache to the history log.
///
/// Runs inside the writer's critical section, so it only enqueues the
/// batch; the background writer task drains the channel into
/// `HistoryLog::add_elements` out of the hot path.
pub struct HistoryHook {
    tx: mpsc::UnboundedSender<Vec<Element>>,
}

impl CommitHook for HistoryHook {
    fn on_commit(&self, _version: u64, elements: &[Element]) {
        if self.tx.send(elements.to_vec()).is_err() {
            tracing::error!("[History] Writer task gone, change not recorded");
        }
    }
}

/// Create the hook/receiver pair for asynchronous history writing.
pub fn history_channel() -> (HistoryHook, mpsc::UnboundedReceiver<Vec<Element>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (HistoryHook { tx }, rx)
}
