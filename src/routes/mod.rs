//! HTTP surface: element sync, autoupdate stream and history reads.

pub mod autoupdate;
pub mod handlers;
pub mod router;

pub use router::create_router;
