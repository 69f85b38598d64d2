use crate::access::Identity;
use crate::element::FullData;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64};
use tokio::sync::mpsc;
use uuid::Uuid;

pub type SessionId = Uuid;

/// One access-filtered update pushed to a subscriber, tagged with the
/// global version it corresponds to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delta {
    pub version: u64,
    pub changed: BTreeMap<String, Vec<FullData>>,
    pub deleted: Vec<String>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.deleted.is_empty()
    }
}

/// Server-side record of an active subscriber.
///
/// `last_version` is the highest version enqueued to (or skipped for) this
/// session; it is the idempotence guard against redelivery. `stale` is set
/// when the session's queue overflows or its receiver is dropped - from
/// then on the session is skipped and expected to resynchronize via the
/// changed-since catch-up path.
pub(crate) struct SubscriberSession {
    pub identity: Identity,
    pub tx: mpsc::Sender<Delta>,
    pub last_version: AtomicU64,
    pub stale: AtomicBool,
}

/// Handle returned to the transport layer on subscribe.
pub struct Subscription {
    pub session_id: SessionId,
    pub receiver: mpsc::Receiver<Delta>,
}
