//! # nudge-memory
//!
//! Persistent reminder store for Nudge (JSON snapshot on disk).

pub mod store;

pub use store::ReminderStore;
