//! Change distribution: per-session fan-out of access-filtered deltas.

pub mod notifier;
pub mod session;

pub use notifier::{ChangeNotifier, DEFAULT_QUEUE_CAPACITY};
pub use session::{Delta, SessionId, Subscription};
