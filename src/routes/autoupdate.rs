/**
 * Autoupdate Subscription Handler
 *
 * This module implements the Server-Sent Events (SSE) handler for the
 * `/autoupdate` endpoint: a one-way stream of access-filtered element
 * deltas, each tagged with the global version it corresponds to.
 *
 * # Catch-up Then Live
 *
 * A client reconnecting after version N passes `?since=N`. The handler
 * subscribes FIRST and computes the catch-up delta second, so any commit
 * landing in between is enqueued rather than lost; live deltas at or
 * below the catch-up version are then skipped, so it is never delivered
 * twice either.
 *
 * # Connection Management
 *
 * - Connections are kept alive using the SSE keep-alive mechanism
 * - A disconnected client drops its receiver; the notifier marks the
 *   session stale on the next commit and the periodic sweep removes it
 * - A session whose queue overflowed has its stream ended server-side;
 *   the client resynchronizes by reconnecting with its last version
 */

use crate::cache::ElementCache;
use crate::notify::{ChangeNotifier, Delta, Subscription};
use crate::routes::handlers::{identity_from_headers, SinceQuery};
use crate::server::state::AppState;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream;
use tokio_stream::Stream;

/// Handle autoupdate subscription (GET /autoupdate?since=N)
///
/// # Query Parameters
///
/// - `since` - the version the client last saw (0 for a fresh client)
///
/// # Returns
///
/// An SSE stream. The first event is the catch-up delta covering
/// `(since, current]` (sent even when empty, so the client learns the
/// current version); every following event is one live delta.
///
/// # Example Response
///
/// ```http
/// HTTP/1.1 200 OK
/// Content-Type: text/event-stream
///
/// event: autoupdate
/// data: {"version":7,"changed":{"core/tag":[{...}]},"deleted":[]}
/// ```
pub async fn handle_autoupdate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SinceQuery>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let identity = identity_from_headers(&headers);
    tracing::info!(
        user_id = ?identity.user_id,
        since = query.since,
        "[Autoupdate] Subscription request received"
    );

    // Subscribe before reading, so the window between the catch-up
    // snapshot and the first live delta is covered by the queue.
    let subscription = state.notifier.subscribe(identity.clone(), query.since);
    let catch_up = catch_up_delta(&state.cache, &identity, query.since).await;
    state
        .notifier
        .acknowledge(subscription.session_id, catch_up.version);

    let stream = delta_stream(state.notifier.clone(), subscription, catch_up);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn catch_up_delta(
    cache: &ElementCache,
    identity: &crate::access::Identity,
    since: u64,
) -> Delta {
    let changed = cache.get_changed_since_restricted(identity, since).await;
    Delta {
        version: changed.version,
        changed: changed.changed,
        deleted: changed.deleted,
    }
}

enum StreamState {
    CatchUp(Delta),
    Live,
}

fn delta_stream(
    notifier: std::sync::Arc<ChangeNotifier>,
    subscription: Subscription,
    catch_up: Delta,
) -> impl Stream<Item = Result<Event, axum::Error>> {
    let floor = catch_up.version;
    stream::unfold(
        (notifier, subscription, StreamState::CatchUp(catch_up)),
        move |(notifier, mut subscription, state)| async move {
            // The catch-up delta is delivered first, before any queued
            // live delta.
            if let StreamState::CatchUp(delta) = state {
                let event = delta_event(&delta)?;
                return Some((Ok(event), (notifier, subscription, StreamState::Live)));
            }

            loop {
                match subscription.receiver.recv().await {
                    Some(delta) => {
                        // Already covered by the catch-up snapshot.
                        if delta.version <= floor {
                            continue;
                        }
                        notifier.acknowledge(subscription.session_id, delta.version);
                        let event = delta_event(&delta)?;
                        return Some((Ok(event), (notifier, subscription, StreamState::Live)));
                    }
                    None => {
                        // Sender side gone: the session was swept after
                        // overflowing. Ending the stream tells the client
                        // to reconnect and resync.
                        tracing::info!(
                            session = %subscription.session_id,
                            "[Autoupdate] Session closed, ending stream"
                        );
                        notifier.unsubscribe(subscription.session_id);
                        return None;
                    }
                }
            }
        },
    )
}

fn delta_event(delta: &Delta) -> Option<Event> {
    match serde_json::to_string(delta) {
        Ok(data) => Some(Event::default().event("autoupdate").data(data)),
        Err(e) => {
            tracing::error!("[Autoupdate] Failed to serialize delta: {:?}", e);
            None
        }
    }
}
