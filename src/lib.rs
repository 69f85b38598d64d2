//! Plenum - Assembly State Synchronization Core
//!
//! Plenum keeps every connected client of an assembly system (projectors,
//! operator desks, delegate devices) synchronized with the authoritative
//! element state, while showing each identity only what it is allowed to
//! see.
//!
//! # Overview
//!
//! This library provides:
//! - A process-wide versioned element cache with a single atomic write path
//! - Per-collection access filters applied on every delivery channel
//! - Per-session fan-out of version-tagged deltas with bounded queues
//! - A durable append-only history of every element change
//!
//! # Module Structure
//!
//! - **`element`** - The element unit of change and its identifier scheme
//! - **`cache`** - Versioned in-memory state, change tracking, commit hooks
//! - **`access`** - Filter registry and the built-in filter kinds
//! - **`notify`** - Subscriber sessions and delta fan-out
//! - **`history`** - SQLite-backed audit trail
//! - **`models`** - Built-in collections and their filter wiring
//! - **`server`** / **`routes`** - Axum wiring and the HTTP surface
//!
//! # Data Flow
//!
//! ```text
//! POST /elements
//!     -> ElementCache::update        (validate, apply, bump version)
//!         -> ChangeNotifier          (per-session filtered deltas)
//!         -> HistoryHook             (enqueue for the history writer)
//!     -> subscribers via /autoupdate (SSE)
//! ```
//!
//! # Consistency Model
//!
//! Updates are linearizable: each committed batch gets exactly one new
//! global change-id, and a reader observing version N sees all writes at
//! or before N and none after. Subscribers that fall behind are dropped
//! and resynchronize through the changed-since catch-up path; they can
//! miss intermediate states but never end up with stale state while
//! connected.
//!
//! # Thread Safety
//!
//! All services are internally synchronized (`tokio::sync::RwLock`,
//! bounded mpsc channels) and shared behind `Arc`; handlers and
//! background tasks clone the state freely.

pub mod access;
pub mod cache;
pub mod element;
pub mod error;
pub mod history;
pub mod models;
pub mod notify;
pub mod routes;
pub mod server;

pub use element::{element_id, Element, FullData};
pub use error::PlenumError;
