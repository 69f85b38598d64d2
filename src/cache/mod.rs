//! Versioned element cache: the single serialization point for all
//! mutations and the source of truth for full and incremental sync.

pub mod service;
pub mod state;

pub use service::{CommitHook, ElementCache, UpdateKind};
pub use state::{CacheState, ChangedSince};
