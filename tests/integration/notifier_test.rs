//! Notifier integration tests: cache commits flowing through to
//! subscriber sessions, including the drop-and-resync path.

use crate::common::{chat_message, small_registry, tag, user_with};
use plenum::access::Identity;
use plenum::cache::{ElementCache, UpdateKind};
use plenum::notify::ChangeNotifier;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio::time::{timeout, Duration};

fn wired() -> (Arc<ElementCache>, Arc<ChangeNotifier>) {
    let registry = small_registry();
    let notifier = Arc::new(ChangeNotifier::new(registry.clone()));
    let mut cache = ElementCache::new(registry);
    cache.add_hook(notifier.clone());
    (Arc::new(cache), notifier)
}

fn wired_with_capacity(capacity: usize) -> (Arc<ElementCache>, Arc<ChangeNotifier>) {
    let registry = small_registry();
    let notifier = Arc::new(ChangeNotifier::with_capacity(registry.clone(), capacity));
    let mut cache = ElementCache::new(registry);
    cache.add_hook(notifier.clone());
    (Arc::new(cache), notifier)
}

#[tokio::test]
async fn test_commit_reaches_subscriber_with_commit_version() {
    let (cache, notifier) = wired();
    let mut subscription = notifier.subscribe(Identity::anonymous(), 0);

    let version = cache.update(vec![tag(1, "live")], UpdateKind::Visible).await.unwrap();

    let delta = timeout(Duration::from_secs(1), subscription.receiver.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delta.version, version);
    assert_eq!(delta.changed["core/tag"][0]["name"], "live");
}

#[tokio::test]
async fn test_bookkeeping_update_is_not_fanned_out() {
    let (cache, notifier) = wired();
    let mut subscription = notifier.subscribe(Identity::anonymous(), 0);

    cache.update(vec![tag(1, "silent")], UpdateKind::Bookkeeping).await.unwrap();
    cache.update(vec![tag(2, "loud")], UpdateKind::Visible).await.unwrap();

    // Only the visible commit arrives, carrying its own version.
    let delta = subscription.receiver.recv().await.unwrap();
    assert_eq!(delta.version, 2);
    assert_eq!(delta.changed["core/tag"][0]["name"], "loud");
    assert!(subscription.receiver.try_recv().is_err());
}

#[tokio::test]
async fn test_deltas_arrive_in_commit_order() {
    let (cache, notifier) = wired();
    let mut subscription = notifier.subscribe(Identity::anonymous(), 0);

    for i in 1..=5 {
        cache.update(vec![tag(i, "batch")], UpdateKind::Visible).await.unwrap();
    }

    let mut versions = Vec::new();
    for _ in 0..5 {
        versions.push(subscription.receiver.recv().await.unwrap().version);
    }
    assert_eq!(versions, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_identities_see_different_deltas_for_same_commit() {
    let (cache, notifier) = wired();
    let mut anon = notifier.subscribe(Identity::anonymous(), 0);
    let mut chatter = notifier.subscribe(user_with(1, &["core.can_use_chat"]), 0);

    cache
        .update(
            vec![tag(1, "public"), chat_message(1, "private")],
            UpdateKind::Visible,
        )
        .await
        .unwrap();

    let anon_delta = anon.receiver.recv().await.unwrap();
    assert!(!anon_delta.changed.contains_key("core/chat-message"));

    let chatter_delta = chatter.receiver.recv().await.unwrap();
    assert_eq!(
        chatter_delta.changed["core/chat-message"][0]["message"],
        "private"
    );
    assert_eq!(anon_delta.version, chatter_delta.version);
}

#[tokio::test]
async fn test_slow_subscriber_resyncs_via_changed_since() {
    let (cache, notifier) = wired_with_capacity(1);
    let slow = notifier.subscribe(Identity::anonymous(), 0);

    // Overflow the queue without draining it.
    cache.update(vec![tag(1, "a")], UpdateKind::Visible).await.unwrap();
    cache.update(vec![tag(2, "b")], UpdateKind::Visible).await.unwrap();
    cache.update(vec![tag(3, "c")], UpdateKind::Visible).await.unwrap();
    assert!(notifier.is_stale(slow.session_id));

    // The reconnect path: catch up from the last acknowledged version,
    // then subscribe fresh from the catch-up version.
    let catch_up = cache
        .get_changed_since_restricted(&Identity::anonymous(), 0)
        .await;
    assert_eq!(catch_up.version, 3);
    assert_eq!(catch_up.changed["core/tag"].len(), 3);

    let mut fresh = notifier.subscribe(Identity::anonymous(), catch_up.version);
    cache.update(vec![tag(4, "d")], UpdateKind::Visible).await.unwrap();
    let delta = fresh.receiver.recv().await.unwrap();
    assert_eq!(delta.version, 4);
}

#[tokio::test]
async fn test_sweep_removes_only_stale_sessions() {
    let (cache, notifier) = wired_with_capacity(1);
    let _slow = notifier.subscribe(Identity::anonymous(), 0);
    let mut healthy = notifier.subscribe(Identity::anonymous(), 0);

    cache.update(vec![tag(1, "a")], UpdateKind::Visible).await.unwrap();
    // Keep the healthy session drained so only the slow one overflows.
    healthy.receiver.recv().await.unwrap();
    cache.update(vec![tag(2, "b")], UpdateKind::Visible).await.unwrap();
    healthy.receiver.recv().await.unwrap();

    assert_eq!(notifier.sweep_stale(), 1);
    assert_eq!(notifier.session_count(), 1);
}
