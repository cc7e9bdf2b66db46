//! Per-user conversation history with bounded growth.
//!
//! [`HistoryStore`] is constructed once and shared (`Arc`) between the
//! workflow engine, which records every completed turn, and the API, which
//! exposes reads and clears.

pub mod entry;
pub mod store;
pub mod topics;

pub use entry::{ConsolidationSummary, EntryPayload, HistoryEntry, SUMMARY_MARKER};
pub use store::{HistoryPolicy, HistoryStore, UserStats};
