/**
 * Change Notifier
 *
 * Fan-out component between the element cache and the transport layer.
 * Registered as a commit hook on the cache: on every committed visible
 * batch it computes one access-filtered delta per active subscriber and
 * enqueues it into that subscriber's bounded queue.
 *
 * # Decoupling
 *
 * `on_commit` runs inside the writer's critical section, so it must never
 * block: it only performs a `try_send` per session. Actual delivery to
 * sockets is the transport's job, draining the per-session receiver.
 *
 * # Ordering and Idempotence
 *
 * Because `on_commit` is invoked in commit order and enqueues in the same
 * call, a session's queue holds versions in non-decreasing order. A
 * session whose `last_version` is already at or past the committed version
 * is skipped, so redelivery of an acknowledged version is a no-op.
 *
 * # Failure Containment
 *
 * A full queue or dropped receiver marks only that session stale; the
 * writer and all other sessions proceed. Stale sessions are swept
 * periodically and resynchronize via `get_changed_since` on reconnect.
 */

use crate::access::{FilterRegistry, Identity};
use crate::cache::CommitHook;
use crate::element::{Element, FullData};
use crate::notify::session::{Delta, SessionId, SubscriberSession, Subscription};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Default bound of a subscriber's delivery queue. A subscriber lagging
/// more than this many commits is dropped and must catch up on reconnect.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

pub struct ChangeNotifier {
    sessions: Mutex<HashMap<SessionId, Arc<SubscriberSession>>>,
    registry: Arc<FilterRegistry>,
    queue_capacity: usize,
}

impl ChangeNotifier {
    pub fn new(registry: Arc<FilterRegistry>) -> Self {
        Self::with_capacity(registry, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(registry: Arc<FilterRegistry>, queue_capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            registry,
            queue_capacity,
        }
    }

    /// Register a subscriber session.
    ///
    /// # Arguments
    ///
    /// * `identity` - the subscriber's identity; fixed for the session
    /// * `last_version` - the version the client last acknowledged (0 for
    ///   a fresh connection); deltas at or below it are never enqueued
    ///
    /// # Returns
    ///
    /// A `Subscription` carrying the session id and the delta receiver to
    /// drain from the transport.
    pub fn subscribe(&self, identity: Identity, last_version: u64) -> Subscription {
        let (tx, receiver) = mpsc::channel(self.queue_capacity);
        let session_id = Uuid::new_v4();
        let session = Arc::new(SubscriberSession {
            identity,
            tx,
            last_version: AtomicU64::new(last_version),
            stale: AtomicBool::new(false),
        });
        self.sessions.lock().unwrap().insert(session_id, session);
        tracing::info!(session = %session_id, last_version, "[Notifier] Session subscribed");
        Subscription {
            session_id,
            receiver,
        }
    }

    /// Remove a session (client disconnected cleanly).
    pub fn unsubscribe(&self, session_id: SessionId) {
        if self.sessions.lock().unwrap().remove(&session_id).is_some() {
            tracing::info!(session = %session_id, "[Notifier] Session unsubscribed");
        }
    }

    /// Record that a session has acknowledged a version.
    ///
    /// Acknowledging an older version than already recorded is ignored, so
    /// the call is safe to repeat.
    pub fn acknowledge(&self, session_id: SessionId, version: u64) {
        if let Some(session) = self.sessions.lock().unwrap().get(&session_id) {
            session.last_version.fetch_max(version, Ordering::SeqCst);
        }
    }

    /// Number of registered sessions, stale ones included.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Whether the given session has been marked stale.
    pub fn is_stale(&self, session_id: SessionId) -> bool {
        self.sessions
            .lock()
            .unwrap()
            .get(&session_id)
            .map(|s| s.stale.load(Ordering::SeqCst))
            .unwrap_or(true)
    }

    /// Drop all stale sessions. Called periodically from a background
    /// task; also safe to call ad hoc.
    pub fn sweep_stale(&self) -> usize {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, session| !session.stale.load(Ordering::SeqCst));
        let swept = before - sessions.len();
        if swept > 0 {
            tracing::info!(swept, remaining = sessions.len(), "[Notifier] Swept stale sessions");
        }
        swept
    }

    fn delta_for(&self, identity: &Identity, version: u64, elements: &[Element]) -> Delta {
        let mut changed: BTreeMap<String, Vec<FullData>> = BTreeMap::new();
        let mut deleted = Vec::new();
        for element in elements {
            match &element.full_data {
                None => deleted.push(element.element_id()),
                Some(full_data) => {
                    if let Some(visible) = self
                        .registry
                        .restrict(&element.collection_string, full_data, identity)
                        .into_data()
                    {
                        changed
                            .entry(element.collection_string.clone())
                            .or_default()
                            .push(visible);
                    }
                }
            }
        }
        Delta {
            version,
            changed,
            deleted,
        }
    }
}

impl CommitHook for ChangeNotifier {
    fn on_commit(&self, version: u64, elements: &[Element]) {
        let sessions = self.sessions.lock().unwrap();
        for (session_id, session) in sessions.iter() {
            if session.stale.load(Ordering::SeqCst) {
                continue;
            }
            // Idempotence: never re-enqueue an acknowledged version.
            if session.last_version.load(Ordering::SeqCst) >= version {
                continue;
            }

            let delta = self.delta_for(&session.identity, version, elements);
            if delta.is_empty() {
                // Nothing visible for this identity; advance the cursor so
                // a redelivery of this version stays a no-op.
                session.last_version.store(version, Ordering::SeqCst);
                continue;
            }

            match session.tx.try_send(delta) {
                Ok(()) => {
                    session.last_version.store(version, Ordering::SeqCst);
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    session.stale.store(true, Ordering::SeqCst);
                    tracing::warn!(
                        session = %session_id,
                        version,
                        "[Notifier] Queue full, session marked stale (will resync on reconnect)"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    session.stale.store(true, Ordering::SeqCst);
                    tracing::debug!(
                        session = %session_id,
                        "[Notifier] Receiver dropped, session marked stale"
                    );
                }
            }
        }
    }
}
