//! Durable audit trail of element changes, independent of the live cache.

pub mod db;
pub mod log;

pub use db::HistoryEntry;
pub use log::{history_channel, HistoryHook, HistoryLog, CAN_SEE_HISTORY, HISTORY_COLLECTION};
